//! Unified error codes for the support helpdesk
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Ticket errors
//! - 4xxx: Company errors
//! - 5xxx: Inbound email / webhook errors
//! - 6xxx: Attachment errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so the admin console can
/// switch on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,
    /// Too many requests from one client
    RateLimited = 9,

    // ==================== 1xxx: Auth ====================
    /// Staff member is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (email/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Account is disabled
    AccountDisabled = 1007,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,

    // ==================== 3xxx: Ticket ====================
    /// Ticket not found
    TicketNotFound = 3001,
    /// Unknown ticket status value
    InvalidTicketStatus = 3002,
    /// Unknown ticket priority value
    InvalidTicketPriority = 3003,
    /// Message content is empty
    EmptyMessage = 3004,
    /// SLA targets are inconsistent
    InvalidSlaTarget = 3101,

    // ==================== 4xxx: Company ====================
    /// Company not found
    CompanyNotFound = 4001,

    // ==================== 5xxx: Inbound email ====================
    /// Webhook signature missing or invalid
    WebhookSignatureInvalid = 5001,
    /// Webhook payload could not be parsed
    WebhookPayloadInvalid = 5002,

    // ==================== 6xxx: Attachment ====================
    /// File too large
    FileTooLarge = 6501,
    /// No file provided in request
    NoFileProvided = 6504,
    /// Empty file provided
    EmptyFile = 6505,
    /// Invalid file extension
    InvalidFileExtension = 6507,
    /// File storage failed
    FileStorageFailed = 6509,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",
            ErrorCode::RateLimited => "Too many requests, try again later",

            // Auth
            ErrorCode::NotAuthenticated => "Staff member is not authenticated",
            ErrorCode::InvalidCredentials => "Invalid email or password",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",
            ErrorCode::AccountDisabled => "Account is disabled",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",

            // Ticket
            ErrorCode::TicketNotFound => "Ticket not found",
            ErrorCode::InvalidTicketStatus => "Invalid ticket status",
            ErrorCode::InvalidTicketPriority => "Invalid ticket priority",
            ErrorCode::EmptyMessage => "Message content is empty",
            ErrorCode::InvalidSlaTarget => "Invalid SLA target",

            // Company
            ErrorCode::CompanyNotFound => "Company not found",

            // Inbound email
            ErrorCode::WebhookSignatureInvalid => "Invalid webhook signature",
            ErrorCode::WebhookPayloadInvalid => "Invalid webhook payload",

            // Attachment
            ErrorCode::FileTooLarge => "File too large",
            ErrorCode::NoFileProvided => "No file provided",
            ErrorCode::EmptyFile => "Empty file provided",
            ErrorCode::InvalidFileExtension => "Invalid file extension",
            ErrorCode::FileStorageFailed => "File storage failed",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),
            9 => Ok(ErrorCode::RateLimited),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1007 => Ok(ErrorCode::AccountDisabled),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),

            // Ticket
            3001 => Ok(ErrorCode::TicketNotFound),
            3002 => Ok(ErrorCode::InvalidTicketStatus),
            3003 => Ok(ErrorCode::InvalidTicketPriority),
            3004 => Ok(ErrorCode::EmptyMessage),
            3101 => Ok(ErrorCode::InvalidSlaTarget),

            // Company
            4001 => Ok(ErrorCode::CompanyNotFound),

            // Inbound email
            5001 => Ok(ErrorCode::WebhookSignatureInvalid),
            5002 => Ok(ErrorCode::WebhookPayloadInvalid),

            // Attachment
            6501 => Ok(ErrorCode::FileTooLarge),
            6504 => Ok(ErrorCode::NoFileProvided),
            6505 => Ok(ErrorCode::EmptyFile),
            6507 => Ok(ErrorCode::InvalidFileExtension),
            6509 => Ok(ErrorCode::FileStorageFailed),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
