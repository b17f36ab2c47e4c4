//! The media-upload fold.

use std::collections::BTreeMap;

use crate::row::UploadRow;

/// Fold upload rows into per-user file lists.
///
/// No dedup: two uploads under the same title are two distinct upload
/// events and both are kept, in row order.
#[must_use]
pub fn fold_uploads(rows: &[UploadRow]) -> BTreeMap<String, Vec<String>> {
    let mut uploads: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in rows {
        uploads.entry(row.user.clone()).or_default().push(row.file_title.clone());
    }
    uploads
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(user: &str, file: &str) -> UploadRow {
        UploadRow {
            user: user.to_string(),
            file_title: file.to_string(),
        }
    }

    #[test]
    fn uploads_append_in_row_order() {
        let rows = vec![
            upload("dave", "File:B.png"),
            upload("dave", "File:A.jpg"),
            upload("erin", "File:C.gif"),
        ];
        let folded = fold_uploads(&rows);
        assert_eq!(folded["dave"], vec!["File:B.png", "File:A.jpg"]);
        assert_eq!(folded["erin"], vec!["File:C.gif"]);
    }

    #[test]
    fn duplicate_titles_are_retained() {
        let rows = vec![upload("dave", "File:A.jpg"), upload("dave", "File:A.jpg")];
        let folded = fold_uploads(&rows);
        assert_eq!(folded["dave"], vec!["File:A.jpg", "File:A.jpg"]);
    }

    #[test]
    fn no_rows_folds_to_empty_map() {
        assert!(fold_uploads(&[]).is_empty());
    }
}
