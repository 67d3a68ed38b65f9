/// Extensions treated as pages. Compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "avif"];

pub fn extension(name: &str) -> Option<&str> {
    let file = name.rsplit('/').next().unwrap_or(name);
    match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => Some(ext),
        _ => None,
    }
}

pub fn is_image_name(name: &str) -> bool {
    extension(name).is_some_and(|ext| {
        IMAGE_EXTENSIONS
            .iter()
            .any(|allowed| ext.eq_ignore_ascii_case(allowed))
    })
}

/// MIME type for a page's data URI. Anything unrecognised is served as JPEG.
pub fn mime_for(name: &str) -> &'static str {
    let ext = extension(name).unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "avif" => "image/avif",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_is_case_insensitive() {
        assert!(is_image_name("ch1/PAGE01.JPG"));
        assert!(is_image_name("cover.WebP"));
        assert!(!is_image_name("ComicInfo.xml"));
        assert!(!is_image_name("jpg"));
        assert!(!is_image_name(".png"));
    }

    #[test]
    fn mime_mapping() {
        assert_eq!(mime_for("a.png"), "image/png");
        assert_eq!(mime_for("a.GIF"), "image/gif");
        assert_eq!(mime_for("a.webp"), "image/webp");
        assert_eq!(mime_for("a.jpeg"), "image/jpeg");
        assert_eq!(mime_for("a.bmp"), "image/bmp");
        assert_eq!(mime_for("noext"), "image/jpeg");
    }
}
