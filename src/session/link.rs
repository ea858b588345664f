use std::sync::LazyLock;

use regex::Regex;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bhttps?://[a-z0-9.-]+(?::\d+)?(?:[/?#][^\s<>"']*)?"#)
        .expect("URL pattern is valid")
});

/// Returns the first http(s) link in `text`, without trailing sentence
/// punctuation.
pub fn first_link(text: &str) -> Option<&str> {
    URL_PATTERN.find_iter(text).find_map(|found| {
        let url = trim_trailing(found.as_str());
        well_formed(url).then_some(url)
    })
}

/// Drops trailing punctuation. A closing parenthesis stays when it closes
/// one opened inside the URL.
fn trim_trailing(mut url: &str) -> &str {
    while let Some(last) = url.chars().next_back() {
        let strip = match last {
            '.' | ',' | ';' | ':' | '!' | '?' | ']' => true,
            ')' => url.matches(')').count() > url.matches('(').count(),
            _ => false,
        };
        if !strip {
            break;
        }
        url = &url[..url.len() - last.len_utf8()];
    }
    url
}

fn well_formed(url: &str) -> bool {
    let Some((_, rest)) = url.split_once("://") else {
        return false;
    };
    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .split(':')
        .next()
        .unwrap_or_default();
    host.contains('.') && !host.starts_with('.') && !host.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_link_inside_reply() {
        assert_eq!(
            first_link("See http://x.test/a.png here"),
            Some("http://x.test/a.png")
        );
    }

    #[test]
    fn first_of_several_links_wins() {
        assert_eq!(
            first_link("https://one.test/a.jpg or https://two.test/b.jpg"),
            Some("https://one.test/a.jpg")
        );
    }

    #[test]
    fn trailing_punctuation_is_dropped() {
        assert_eq!(
            first_link("Hawa Mahal looks like this: https://img.test/hawa.png."),
            Some("https://img.test/hawa.png")
        );
        assert_eq!(
            first_link("(photo at http://img.test:8080/fort.jpg)"),
            Some("http://img.test:8080/fort.jpg")
        );
    }

    #[test]
    fn balanced_parentheses_stay_in_the_link() {
        assert_eq!(
            first_link("Read https://wiki.test/Amer_(fort) before you go"),
            Some("https://wiki.test/Amer_(fort)")
        );
        assert_eq!(
            first_link("(see https://wiki.test/Amer_(fort)), then lunch."),
            Some("https://wiki.test/Amer_(fort)")
        );
    }

    #[test]
    fn plain_text_has_no_link() {
        assert_eq!(first_link("Visit Jaipur"), None);
        assert_eq!(first_link("ftp://files.test/a.png"), None);
        assert_eq!(first_link("http://localhost/a.png"), None);
    }
}
