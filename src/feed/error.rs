use thiserror::Error;

/// Errors produced by the feed pipeline. Network and fetch variants cover the
/// download stage, the parse variants cover malformed static tables, corrupt
/// archives and undecodable realtime payloads, and `NoDataYet` is the read
/// condition before the first successful refresh has published a snapshot.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Fetch failed: {0}")]
    FetchFailed(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("CSV parse error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Realtime decode error: {0}")]
    DecodeError(#[from] prost::DecodeError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
    #[error("No feed data loaded yet")]
    NoDataYet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_fetch_failed() {
        let err = FeedError::FetchFailed("HTTP 503 from upstream".into());
        assert_eq!(err.to_string(), "Fetch failed: HTTP 503 from upstream");
    }

    #[test]
    fn error_display_parse_error() {
        let err = FeedError::ParseError("shapes.txt missing shape_id".into());
        assert_eq!(err.to_string(), "Parse error: shapes.txt missing shape_id");
    }

    #[test]
    fn error_display_no_data_yet() {
        let err = FeedError::NoDataYet;
        assert_eq!(err.to_string(), "No feed data loaded yet");
    }

    #[test]
    fn error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: FeedError = io_err.into();
        assert!(err.to_string().contains("no such file"));
        assert!(matches!(err, FeedError::IoError(_)));
    }

    #[test]
    fn error_from_prost_decode_error() {
        // Decode invalid protobuf to get a DecodeError
        let bad_bytes: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F];
        let result = <gtfs_realtime::FeedMessage as prost::Message>::decode(bad_bytes);
        let decode_err = result.unwrap_err();
        let err: FeedError = decode_err.into();
        assert!(matches!(err, FeedError::DecodeError(_)));
    }
}
