//! Upload limits and file-type rules.

use crate::error::CoreError;

/// Default ceiling for any uploaded file (20 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// An identical upload inside this window is treated as a double submit.
pub const DEFAULT_DUPLICATE_WINDOW_SECS: i64 = 60;

/// Extensions accepted for the signed contract scan.
pub const CONTRACT_SCAN_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];

pub fn validate_upload_size(len: usize, max_bytes: usize) -> Result<(), CoreError> {
    if len == 0 {
        return Err(CoreError::Validation("Uploaded file is empty".to_string()));
    }
    if len > max_bytes {
        return Err(CoreError::Validation(format!(
            "File is too large ({len} bytes); the limit is {} MB",
            max_bytes / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Lower-cased extension of a file name, if any.
pub fn file_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

pub fn validate_contract_scan(filename: &str, len: usize, max_bytes: usize) -> Result<(), CoreError> {
    match file_extension(filename) {
        Some(ext) if CONTRACT_SCAN_EXTENSIONS.contains(&ext.as_str()) => {}
        _ => {
            return Err(CoreError::Validation(format!(
                "Contract scan must be one of: {}",
                CONTRACT_SCAN_EXTENSIONS.join(", ")
            )))
        }
    }
    validate_upload_size(len, max_bytes)
}

/// Keep only the final path component of a client-supplied file name.
pub fn client_file_name(raw: &str) -> String {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if name.is_empty() {
        "upload".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_files_over_the_limit() {
        assert!(validate_upload_size(DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MAX_UPLOAD_BYTES).is_ok());
        assert!(validate_upload_size(DEFAULT_MAX_UPLOAD_BYTES + 1, DEFAULT_MAX_UPLOAD_BYTES).is_err());
        assert!(validate_upload_size(0, DEFAULT_MAX_UPLOAD_BYTES).is_err());
    }

    #[test]
    fn contract_scan_accepts_office_and_pdf() {
        assert!(validate_contract_scan("contract.PDF", 10, DEFAULT_MAX_UPLOAD_BYTES).is_ok());
        assert!(validate_contract_scan("contract.docx", 10, DEFAULT_MAX_UPLOAD_BYTES).is_ok());
        assert!(validate_contract_scan("contract.png", 10, DEFAULT_MAX_UPLOAD_BYTES).is_err());
        assert!(validate_contract_scan("contract", 10, DEFAULT_MAX_UPLOAD_BYTES).is_err());
    }

    #[test]
    fn client_file_name_drops_directories() {
        assert_eq!(client_file_name("C:\\Users\\me\\scan.pdf"), "scan.pdf");
        assert_eq!(client_file_name("../../etc/passwd"), "passwd");
        assert_eq!(client_file_name(""), "upload");
    }
}
