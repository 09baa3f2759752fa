use crate::core::errors::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fs;
use std::path::Path;

fn image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        _ => return None,
    };
    Some(mime)
}

/// Reads an image into a `data:` URL the presentation layer can display directly.
pub fn image_data_url(path: &Path, max_bytes: u64) -> Result<String> {
    let mime = image_mime(path).ok_or_else(|| {
        Error::UnsupportedFormat(format!("not a previewable image: {}", path.display()))
    })?;

    let md = fs::metadata(path).map_err(|e| Error::from_io(path, e))?;
    if md.len() > max_bytes {
        return Err(Error::TooLarge {
            path: path.to_path_buf(),
            size: md.len(),
            limit: max_bytes,
        });
    }

    let data = fs::read(path).map_err(|e| Error::from_io(path, e))?;
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn encodes_png_as_data_url() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Pixel.PNG");
        fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let url = image_data_url(&path, 1024)?;
        assert_eq!(url, "data:image/png;base64,iVBORw==");
        Ok(())
    }

    #[test]
    fn rejects_other_extensions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "hi").unwrap();
        assert!(matches!(
            image_data_url(&path, 1024),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn rejects_files_over_the_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.jpg");
        fs::write(&path, vec![0u8; 64]).unwrap();
        assert!(matches!(
            image_data_url(&path, 16),
            Err(Error::TooLarge { size: 64, .. })
        ));
    }
}
