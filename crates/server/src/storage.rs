//! Upload storage on the local filesystem

use std::path::{Path, PathBuf};

use unicode_normalization::UnicodeNormalization;

/// Extensions accepted for upload (compared case-insensitively)
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "dcm", "dicom"];

/// Whether `filename` carries an allowed extension after its last dot
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Reduce a client-supplied filename to a safe single path component.
///
/// The name is NFKD-decomposed so accented letters fold to their ASCII base,
/// and whatever is still non-ASCII is dropped. Path separators become
/// whitespace, whitespace runs become `_`, anything outside `[A-Za-z0-9_.-]`
/// is dropped, and leading/trailing `.`/`_` are stripped. May return an
/// empty string.
pub fn secure_filename(filename: &str) -> String {
    let folded: String = filename.nfkd().filter(char::is_ascii).collect();
    let spaced = folded.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Directory holding uploaded files
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the upload directory if it does not exist
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a stored file; `filename` must already be sanitized
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Write `bytes` under `filename`, replacing any previous upload of that name
    pub async fn save(&self, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.path_for(filename);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Public URL for a stored file
    pub fn url_for(filename: &str) -> String {
        format!("/uploads/{}", filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_allow_list() {
        assert!(allowed_file("scan.png"));
        assert!(allowed_file("scan.JPEG"));
        assert!(allowed_file("archive.tar.dcm"));
        assert!(allowed_file("series.DiCoM"));
        assert!(!allowed_file("notes.txt"));
        assert!(!allowed_file("png"));
        assert!(!allowed_file("scan.png.exe"));
        assert!(!allowed_file("scan."));
    }

    #[test]
    fn sanitizes_like_secure_filename() {
        assert_eq!(secure_filename("My cool movie.mov"), "My_cool_movie.mov");
        assert_eq!(secure_filename("../../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("i contain cool \u{fc}ml\u{e4}uts.png"), "i_contain_cool_umlauts.png");
        assert_eq!(secure_filename("C:\\scans\\neck x-ray.JPG"), "C_scans_neck_x-ray.JPG");
        assert_eq!(secure_filename(".hidden.png"), "hidden.png");
        assert_eq!(secure_filename("..."), "");
    }

    #[test]
    fn folds_accents_and_drops_other_non_ascii() {
        assert_eq!(secure_filename("Fra\u{308}ktur C2.png"), "Fraktur_C2.png");
        assert_eq!(secure_filename("r\u{e9}sum\u{e9} \u{ff11}.jpg"), "resume_1.jpg");
        assert_eq!(secure_filename("\u{8108}\u{690e}.png"), "png");
    }

    #[tokio::test]
    async fn save_overwrites_same_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("uploads"));
        store.ensure_dir().await.unwrap();

        store.save("a.png", b"first").await.unwrap();
        let path = store.save("a.png", b"second").await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"second");
        assert_eq!(UploadStore::url_for("a.png"), "/uploads/a.png");
    }
}
