use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

// The filesystem operations understood by the backend, named as they appear in
// the `op` query parameter.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Display, EnumString, EnumIter, PartialEq, Eq, Hash,
)]
pub enum OperationName {
    #[serde(rename = "GETHOMEDIRECTORY")]
    #[strum(serialize = "GETHOMEDIRECTORY")]
    GetHomeDirectory,
    #[serde(rename = "LISTSTATUS")]
    #[strum(serialize = "LISTSTATUS")]
    ListStatus,
    #[serde(rename = "GETFILESTATUS")]
    #[strum(serialize = "GETFILESTATUS")]
    GetFileStatus,
    #[serde(rename = "GETFILECHECKSUM")]
    #[strum(serialize = "GETFILECHECKSUM")]
    GetFileChecksum,
    #[serde(rename = "GETCONTENTSUMMARY")]
    #[strum(serialize = "GETCONTENTSUMMARY")]
    GetContentSummary,
    #[serde(rename = "OPEN")]
    #[strum(serialize = "OPEN")]
    Open,
    #[serde(rename = "CREATE")]
    #[strum(serialize = "CREATE")]
    Create,
    #[serde(rename = "APPEND")]
    #[strum(serialize = "APPEND")]
    Append,
    #[serde(rename = "CONCAT")]
    #[strum(serialize = "CONCAT")]
    Concat,
    #[serde(rename = "TRUNCATE")]
    #[strum(serialize = "TRUNCATE")]
    Truncate,
    #[serde(rename = "DELETE")]
    #[strum(serialize = "DELETE")]
    Delete,
    #[serde(rename = "RENAME")]
    #[strum(serialize = "RENAME")]
    Rename,
    #[serde(rename = "MKDIRS")]
    #[strum(serialize = "MKDIRS")]
    Mkdirs,
    #[serde(rename = "SETPERMISSION")]
    #[strum(serialize = "SETPERMISSION")]
    SetPermission,
    #[serde(rename = "SETOWNER")]
    #[strum(serialize = "SETOWNER")]
    SetOwner,
    #[serde(rename = "SETREPLICATION")]
    #[strum(serialize = "SETREPLICATION")]
    SetReplication,
    #[serde(rename = "CREATESYMLINK")]
    #[strum(serialize = "CREATESYMLINK")]
    CreateSymlink,
}
