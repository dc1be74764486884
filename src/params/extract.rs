use http::{HeaderMap, Uri};

/// Raw parameter sources of one request.
///
/// Query pairs are percent-decoded (with `+` as space) and keep their order;
/// header lookups are case-insensitive.
#[derive(Debug)]
pub struct RequestParts<'r> {
    query: Vec<(String, String)>,
    headers: &'r HeaderMap,
    cookies: Vec<(String, String)>,
}

impl<'r> RequestParts<'r> {
    pub fn new(uri: &Uri, headers: &'r HeaderMap) -> Self {
        Self {
            query: parse_query_pairs(uri.query().unwrap_or_default()),
            headers,
            cookies: parse_cookies(headers),
        }
    }

    pub fn from_request<B>(req: &'r http::Request<B>) -> Self {
        Self::new(req.uri(), req.headers())
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Every value sent for `name`, in request order.
    pub fn query_values(&self, name: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn has_query_key(&self, name: &str) -> bool {
        self.query.iter().any(|(k, _)| k == name)
    }

    /// Header value with repeated fields joined by `,`.
    ///
    /// # Errors
    ///
    /// Returns a description when a value is not visible ASCII.
    pub fn header(&self, name: &str) -> Result<Option<String>, String> {
        let mut joined: Option<String> = None;
        for value in self.headers.get_all(name) {
            let text = value
                .to_str()
                .map_err(|_| format!("header '{name}' contains bytes that are not visible ASCII"))?;
            match joined.as_mut() {
                Some(acc) => {
                    acc.push(',');
                    acc.push_str(text);
                }
                None => joined = Some(text.to_string()),
            }
        }
        Ok(joined)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse a raw query string into ordered, decoded pairs
pub fn parse_query_pairs(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Cookie name/value pairs from every `Cookie` header
pub fn parse_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|c| c.split(';'))
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim();
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_query_pairs_keep_order_and_repeats() {
        let uri: Uri = "/pets?id=1&name=a+b&id=2&x=%2C".parse().unwrap();
        let headers = HeaderMap::new();
        let parts = RequestParts::new(&uri, &headers);
        assert_eq!(parts.query_values("id"), vec!["1", "2"]);
        assert_eq!(parts.query_values("name"), vec!["a b"]);
        assert_eq!(parts.query_values("x"), vec![","]);
        assert!(parts.query_values("missing").is_empty());
    }

    #[test]
    fn test_headers_are_case_insensitive_and_joined() {
        let mut headers = HeaderMap::new();
        headers.append("X-Trace", HeaderValue::from_static("a"));
        headers.append("x-trace", HeaderValue::from_static("b"));
        let uri: Uri = "/".parse().unwrap();
        let parts = RequestParts::new(&uri, &headers);
        assert_eq!(parts.header("X-TRACE").unwrap().as_deref(), Some("a,b"));
        assert_eq!(parts.header("absent").unwrap(), None);
    }

    #[test]
    fn test_non_ascii_header_is_an_error() {
        let mut headers = HeaderMap::new();
        headers.insert("x-bin", HeaderValue::from_bytes(b"caf\xe9").unwrap());
        let uri: Uri = "/".parse().unwrap();
        assert!(RequestParts::new(&uri, &headers).header("x-bin").is_err());
    }

    #[test]
    fn test_parse_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::COOKIE,
            HeaderValue::from_static("session=abc; theme = dark; flag"),
        );
        let cookies = parse_cookies(&headers);
        assert_eq!(
            cookies,
            vec![
                ("session".to_string(), "abc".to_string()),
                ("theme".to_string(), "dark".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }
}
