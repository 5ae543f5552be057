pub const COVER_FILENAME: &str = "cover.jpg";
pub const IMAGE_EXTENSION: &str = "jpg";

/// Temp-dir filename of an article image; the index template links to the same name.
pub fn image_filename(idx: u32) -> String {
    format!("{idx}.{IMAGE_EXTENSION}")
}

/// `{prefix}_{date}.{extension}` with spaces in the date turned into underscores.
///
/// Characters that cannot appear in a filename are replaced as well, so a date
/// such as `03/2024` cannot escape into a subdirectory.
pub fn output_filename(prefix: &str, date: &str, extension: &str) -> String {
    let date = sanitize(&date.replace(' ', "_"));
    format!("{}_{date}.{extension}", sanitize(prefix))
}

fn sanitize(input: &str) -> String {
    input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect()
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_in_date_become_underscores() {
        assert_eq!(output_filename("mag", "March 2024", "mobi"), "mag_March_2024.mobi");
    }

    #[test]
    fn separators_cannot_leak_into_path() {
        assert_eq!(output_filename("mag", "03/2024", "mobi"), "mag_03_2024.mobi");
    }

    #[test]
    fn article_images_use_index_as_stem() {
        assert_eq!(image_filename(12), "12.jpg");
    }
}
