//! Paths used as redirect targets

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters escaped in the `next` parameter; path separators stay readable
const NEXT_PARAM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub const CATALOG_INDEX: &str = "/catalog/";
pub const BOOKS: &str = "/catalog/books";
pub const AUTHORS: &str = "/catalog/authors";
pub const BORROWED: &str = "/catalog/borrowed";

pub fn book_detail(id: i32) -> String {
    format!("/catalog/book/{}", id)
}

pub fn author_detail(id: i32) -> String {
    format!("/catalog/author/{}", id)
}

/// Login page carrying the path (and query) to come back to
pub fn login(login_url: &str, next: &str) -> String {
    format!("{}?next={}", login_url, utf8_percent_encode(next, NEXT_PARAM))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_paths() {
        assert_eq!(book_detail(3), "/catalog/book/3");
        assert_eq!(author_detail(12), "/catalog/author/12");
    }

    #[test]
    fn login_keeps_the_requested_path() {
        assert_eq!(
            login("/accounts/login/", "/catalog/mybooks"),
            "/accounts/login/?next=/catalog/mybooks"
        );
    }

    #[test]
    fn login_escapes_the_query_string() {
        assert_eq!(
            login("/accounts/login/", "/catalog/borrowed?page=2&a=b c"),
            "/accounts/login/?next=/catalog/borrowed%3Fpage%3D2%26a%3Db%20c"
        );
    }
}
