//! Request and response types carried through interception.

/// One outgoing request from a controlled page. Cache matching keys on
/// the URL, so that is all a request carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
}

impl Request {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// A completed response, either live from the network or rebuilt from a
/// cache bucket. HTTP error statuses are still completed responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_success_bounds() {
        let mut response = Response {
            url: "/".to_string(),
            status: 200,
            content_type: None,
            body: Vec::new(),
        };
        assert!(response.is_success());

        response.status = 299;
        assert!(response.is_success());

        response.status = 304;
        assert!(!response.is_success());

        response.status = 404;
        assert!(!response.is_success());
    }
}
