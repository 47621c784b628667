use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::create_bucket::CreateBucketError;
use aws_sdk_s3::operation::delete_object::DeleteObjectError;
use aws_sdk_s3::operation::get_bucket_location::GetBucketLocationError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::put_object::PutObjectError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object not found: bucket={bucket}, key={key}")]
    NotFound { bucket: String, key: String },
    #[error("Bucket does not exist: {0}")]
    NoSuchBucket(String),
    #[error("Failed to put object : {0}")]
    UnableToPutObject(#[from] SdkError<PutObjectError>),
    #[error("Failed to get data from S3: {0}")]
    GetObjectError(#[from] SdkError<GetObjectError>),
    #[error("Unable to delete object : {0}")]
    DeleteObjectError(#[from] SdkError<DeleteObjectError>),
    #[error("Failed to get bucket location: {0}")]
    GetBucketLocationError(#[from] SdkError<GetBucketLocationError>),
    #[error("Failed to create bucket: {0}")]
    CreateBucketError(#[from] SdkError<CreateBucketError>),
    #[error("Failed to stream object: {0}")]
    ObjectStreamError(String),
    #[error("Invalid presigning config: {0}")]
    PresigningConfigError(String),
    #[error("Failed to read object body from disk: {0}")]
    BodyIoError(#[from] std::io::Error),
}

impl StorageError {
    /// True when the store reported the requested object as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}
