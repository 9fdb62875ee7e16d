//! Result envelope returned by the access layer

use crate::error::{ApiError, ApiResult};

/// Outcome of one logical API call
///
/// Carries the HTTP status (or 500 for failures that never produced a
/// response) and either the decoded data or the normalized error, never both.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    status: u16,
    result: Result<Option<T>, ApiError>,
}

impl<T> Envelope<T> {
    /// Successful call; `data` is `None` for empty bodies
    pub fn success(status: u16, data: Option<T>) -> Self {
        Self {
            status,
            result: Ok(data),
        }
    }

    /// Failed call; the status comes from the error
    pub fn failure(error: ApiError) -> Self {
        Self {
            status: error.status(),
            result: Err(error),
        }
    }

    /// Status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Whether the call succeeded
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Data, if the call succeeded with a body
    pub fn data(&self) -> Option<&T> {
        self.result.as_ref().ok().and_then(Option::as_ref)
    }

    /// Error, if the call failed
    pub fn error(&self) -> Option<&ApiError> {
        self.result.as_ref().err()
    }

    /// Convert to a plain `Result`
    pub fn into_result(self) -> ApiResult<Option<T>> {
        self.result
    }

    /// Data or an error; an empty success is a decode error
    pub fn into_data(self) -> ApiResult<T> {
        let status = self.status;
        self.result?
            .ok_or_else(|| ApiError::decode(status, "response body was empty"))
    }

    /// Transform the data, keeping status and error
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            status: self.status,
            result: self.result.map(|data| data.map(f)),
        }
    }

    /// Transform the data with a fallible function
    pub fn and_then<U>(self, f: impl FnOnce(T) -> ApiResult<U>) -> Envelope<U> {
        let status = self.status;
        match self.result {
            Ok(Some(data)) => match f(data) {
                Ok(mapped) => Envelope::success(status, Some(mapped)),
                Err(e) => Envelope::failure(e),
            },
            Ok(None) => Envelope::success(status, None),
            Err(e) => Envelope::failure(e),
        }
    }
}

impl<T> From<ApiError> for Envelope<T> {
    fn from(error: ApiError) -> Self {
        Self::failure(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_holds_data_only() {
        let envelope = Envelope::success(200, Some(7));

        assert!(envelope.is_success());
        assert_eq!(envelope.data(), Some(&7));
        assert!(envelope.error().is_none());
        assert_eq!(envelope.into_data().unwrap(), 7);
    }

    #[test]
    fn test_empty_success() {
        let envelope: Envelope<u32> = Envelope::success(204, None);

        assert!(envelope.is_success());
        assert_eq!(envelope.status(), 204);
        assert!(envelope.data().is_none());
        assert!(matches!(envelope.into_data(), Err(ApiError::Decode { status: 204, .. })));
    }

    #[test]
    fn test_failure_takes_error_status() {
        let envelope: Envelope<u32> = ApiError::http(404, "Boat not found").into();

        assert!(!envelope.is_success());
        assert_eq!(envelope.status(), 404);
        assert!(envelope.data().is_none());

        let local: Envelope<u32> = Envelope::failure(ApiError::Network("refused".into()));
        assert_eq!(local.status(), 500);
    }

    #[test]
    fn test_map_and_then() {
        let doubled = Envelope::success(200, Some(21)).map(|n| n * 2);
        assert_eq!(doubled.data(), Some(&42));

        let failed = Envelope::success(200, Some(1)).and_then(|_| -> ApiResult<u32> {
            Err(ApiError::decode(200, "bad shape"))
        });
        assert_eq!(failed.status(), 200);
        assert!(matches!(failed.error(), Some(ApiError::Decode { .. })));
    }
}
