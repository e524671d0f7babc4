//! File name classification shared by all backends.

use crate::FileClass;

/// Extensions treated as page content. Everything else is a resource.
pub const CONTENT_EXTENSIONS: &[&str] = &["md", "markdown", "html", "htm"];

/// True if the extension (without dot, any case) denotes page content.
#[must_use]
pub fn is_content_ext(ext: &str) -> bool {
    CONTENT_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext))
}

/// Split a trailing language segment off a base name.
///
/// `"post.fr"` with `fr` among `languages` yields `("post", Some("fr"))`.
/// Unknown segments stay part of the name.
#[must_use]
pub fn split_lang<'a>(base: &'a str, languages: &[String]) -> (&'a str, Option<&'a str>) {
    match base.rsplit_once('.') {
        Some((name, lang)) if !name.is_empty() && languages.iter().any(|l| l == lang) => {
            (name, Some(lang))
        }
        _ => (base, None),
    }
}

/// Classify a file by its name.
///
/// `index.<ext>` is a leaf bundle header, `_index.<ext>` a branch bundle
/// header, other content extensions are plain content, the rest resources.
/// A language segment (`index.fr.md`) is ignored for classification.
#[must_use]
pub fn classify(name: &str, languages: &[String]) -> FileClass {
    let Some((base, ext)) = name.rsplit_once('.') else {
        return FileClass::Resource;
    };
    if base.is_empty() || !is_content_ext(ext) {
        return FileClass::Resource;
    }
    match split_lang(base, languages).0 {
        "index" => FileClass::LeafHeader,
        "_index" => FileClass::BranchHeader,
        _ => FileClass::Content,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn langs() -> Vec<String> {
        vec!["en".to_owned(), "fr".to_owned()]
    }

    #[test]
    fn test_classify_headers() {
        assert_eq!(classify("index.md", &langs()), FileClass::LeafHeader);
        assert_eq!(classify("_index.md", &langs()), FileClass::BranchHeader);
        assert_eq!(classify("index.fr.md", &langs()), FileClass::LeafHeader);
        assert_eq!(classify("_index.en.html", &langs()), FileClass::BranchHeader);
    }

    #[test]
    fn test_classify_content_and_resources() {
        assert_eq!(classify("post.md", &langs()), FileClass::Content);
        assert_eq!(classify("post.MARKDOWN", &langs()), FileClass::Content);
        assert_eq!(classify("photo.jpg", &langs()), FileClass::Resource);
        assert_eq!(classify("index.json", &langs()), FileClass::Resource);
        assert_eq!(classify("LICENSE", &langs()), FileClass::Resource);
    }

    #[test]
    fn test_classify_unknown_lang_is_content() {
        assert_eq!(classify("index.de.md", &langs()), FileClass::Content);
    }

    #[test]
    fn test_split_lang() {
        assert_eq!(split_lang("post.fr", &langs()), ("post", Some("fr")));
        assert_eq!(split_lang("post.v2", &langs()), ("post.v2", None));
        assert_eq!(split_lang("post", &langs()), ("post", None));
        assert_eq!(split_lang(".fr", &langs()), (".fr", None));
    }
}
