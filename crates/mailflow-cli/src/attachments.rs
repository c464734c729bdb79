use std::path::Path;

use mailflow_client::Attachment;

/// Reads a file into an attachment, guessing its content type from the extension.
pub async fn load_attachment(path: &Path) -> std::io::Result<Attachment> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("attachment")
        .to_string();
    let attachment = Attachment::new(file_name, bytes);
    Ok(match guess_content_type(path) {
        Some(content_type) => attachment.content_type(content_type),
        None => attachment,
    })
}

fn guess_content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let content_type = match ext.as_str() {
        "txt" | "log" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => return None,
    };
    Some(content_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[tokio::test]
    async fn loads_bytes_name_and_type() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Invoice.PDF");
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(b"%PDF-1.7").expect("write");

        let attachment = load_attachment(&path).await.expect("load");
        assert_eq!(attachment.file_name, "Invoice.PDF");
        assert_eq!(attachment.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(attachment.bytes.as_ref(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn unknown_extension_leaves_type_to_backend() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.xyz");
        std::fs::write(&path, b"x").expect("write");
        let attachment = load_attachment(&path).await.expect("load");
        assert_eq!(attachment.content_type, None);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load_attachment(&dir.path().join("nope.txt")).await.is_err());
    }
}
