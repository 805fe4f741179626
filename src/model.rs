pub mod receipt_response;
pub mod submission_record;
