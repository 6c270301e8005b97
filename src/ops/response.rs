use serde::{Deserialize, Serialize, Serializer};

use crate::errors::OperationError;

// Refer: https://hadoop.apache.org/docs/r2.9.2/hadoop-project-dist/hadoop-hdfs/WebHDFS.html#FileStatus_Properties
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileType {
    #[serde(rename = "FILE")]
    File,
    #[serde(rename = "DIRECTORY")]
    Directory,
    #[serde(rename = "SYMLINK")]
    Symlink,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FileStatus {
    #[serde(rename = "type")]
    pub file_type: FileType,
    // Relative name component, empty for GETFILESTATUS.
    #[serde(rename = "pathSuffix", default)]
    pub path_suffix: String,
    // Octal permission string.
    #[serde(rename = "permission")]
    pub permission: String,
    #[serde(rename = "length")]
    pub length: u64,
    #[serde(rename = "blockSize")]
    pub block_size: u64,
    // Milliseconds since epoch.
    #[serde(rename = "accessTime")]
    pub access_time: u64,
    #[serde(rename = "modificationTime", default)]
    pub modification_time: Option<u64>,
    #[serde(rename = "owner")]
    pub owner: String,
    #[serde(rename = "group")]
    pub group: String,
    #[serde(rename = "replication")]
    pub replication: u32,
    // Link target, present for symlinks only.
    #[serde(rename = "symlink", default, skip_serializing_if = "Option::is_none")]
    pub symlink: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ContentSummary {
    #[serde(rename = "directoryCount")]
    pub directory_count: u64,
    #[serde(rename = "fileCount")]
    pub file_count: u64,
    #[serde(rename = "length")]
    pub length: u64,
    // -1 if no quota is set.
    #[serde(rename = "quota")]
    pub quota: i64,
    // length * replication
    #[serde(rename = "spaceConsumed")]
    pub space_consumed: u64,
    #[serde(rename = "spaceQuota")]
    pub space_quota: i64,
}

/// A file checksum; `bytes` holds exactly `length` decoded bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileChecksum {
    #[serde(rename = "algorithm")]
    pub algorithm: String,
    #[serde(rename = "bytes", serialize_with = "serialize_hex")]
    pub bytes: Vec<u8>,
    #[serde(rename = "length")]
    pub length: usize,
}

fn serialize_hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

impl FileChecksum {
    /// Decodes the first `2 * length` hex characters of `hex_str`.
    pub fn from_hex(
        algorithm: String,
        hex_str: &str,
        length: usize,
    ) -> Result<Self, OperationError> {
        if length == 0 {
            return Err(OperationError::Decode(
                "checksum length should be at least 1".to_owned(),
            ));
        }
        let hex_len = length.checked_mul(2).ok_or_else(|| {
            OperationError::Decode(format!("invalid checksum length: {}", length))
        })?;
        if hex_len > hex_str.len() {
            return Err(OperationError::Decode(format!(
                "checksum length {} exceeds the {} available bytes",
                length,
                hex_str.len() / 2
            )));
        }
        let bytes = hex::decode(&hex_str.as_bytes()[..hex_len])
            .map_err(|e| OperationError::Decode(format!("invalid checksum bytes: {}", e)))?;
        Ok(FileChecksum {
            algorithm,
            bytes,
            length,
        })
    }
}

#[derive(Deserialize)]
struct RawFileChecksum {
    #[serde(rename = "algorithm")]
    algorithm: String,
    #[serde(rename = "bytes")]
    bytes: String,
    #[serde(rename = "length")]
    length: usize,
}

#[derive(Deserialize)]
pub(super) struct PathResponse {
    #[serde(rename = "Path")]
    pub path: String,
}

#[derive(Deserialize)]
pub(super) struct BooleanResponse {
    #[serde(rename = "boolean")]
    pub boolean: bool,
}

#[derive(Deserialize)]
pub(super) struct FileStatusResponse {
    #[serde(rename = "FileStatus")]
    pub file_status: FileStatus,
}

#[derive(Deserialize)]
struct FileStatusList {
    #[serde(rename = "FileStatus", default)]
    file_status: Vec<FileStatus>,
}

#[derive(Deserialize)]
pub(super) struct ListStatusResponse {
    #[serde(rename = "FileStatuses")]
    file_statuses: FileStatusList,
}

impl ListStatusResponse {
    pub fn into_statuses(self) -> Vec<FileStatus> {
        self.file_statuses.file_status
    }
}

#[derive(Deserialize)]
pub(super) struct ContentSummaryResponse {
    #[serde(rename = "ContentSummary")]
    pub content_summary: ContentSummary,
}

#[derive(Deserialize)]
pub(super) struct FileChecksumResponse {
    #[serde(rename = "FileChecksum")]
    file_checksum: RawFileChecksum,
}

impl FileChecksumResponse {
    pub fn into_checksum(self) -> Result<FileChecksum, OperationError> {
        let raw = self.file_checksum;
        FileChecksum::from_hex(raw.algorithm, &raw.bytes, raw.length)
    }
}

/// A typed, decoded backend response.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum DecodedResult {
    Empty,
    Boolean(bool),
    HomeDirectory(String),
    FileStatus(FileStatus),
    Listing(Vec<FileStatus>),
    Checksum(FileChecksum),
    ContentSummary(ContentSummary),
}
