/// Smallest page size the list endpoint will serve
/// Smaller requests are raised to this value
pub const MIN_PAGE_SIZE: i64 = 10;

/// Page size used when the client does not send one
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Page index that disables pagination and returns every record
pub const PAGE_INDEX_ALL: i64 = -1;

/// Lifetime of temporary upload credentials in seconds (1 hour)
pub const DEFAULT_UPLOAD_CREDENTIALS_TTL_SECS: i32 = 3600;

/// Maximum number of files in one upload credential request
/// Session policies are size-limited, so each path costs policy space
pub const MAX_FILES_PER_UPLOAD: usize = 10;

/// Maximum length of a client-supplied file name
pub const MAX_FILE_NAME_LEN: usize = 128;

// =============================================================================
// Error Messages
// =============================================================================

/// Error message for submissions without the mandatory text fields
pub const ERR_MISSING_REQUIRED_FIELDS: &str =
    "impactedModule, bugDescription and reproduceSteps are required";

/// Error message for attached files that were not issued by this server
pub const ERR_FOREIGN_FILE_PATH: &str = "File path is outside the feedback directory";

/// Error message for negative file sizes
pub const ERR_INVALID_FILE_SIZE: &str = "File size must not be negative";

/// Error message for unusable file names in upload requests
pub const ERR_INVALID_FILE_NAME: &str = "Invalid file name";

/// Error message for oversized upload batches
pub const ERR_TOO_MANY_FILES: &str = "Too many files in one upload request";
