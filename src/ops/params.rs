use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{check_file_path, parent_directory, OperationName};
use crate::errors::OperationError;

const PARAM_DATA: &str = "data";
const PARAM_OVERWRITE: &str = "overwrite";
const PARAM_BLOCK_SIZE: &str = "blocksize";
const PARAM_BUFFER_SIZE: &str = "buffersize";
const PARAM_REPLICATION: &str = "replication";
const PARAM_PERMISSION: &str = "permission";
const PARAM_LENGTH: &str = "length";
const PARAM_OFFSET: &str = "offset";
const PARAM_SOURCES: &str = "sources";
const PARAM_NEW_LENGTH: &str = "newlength";
const PARAM_RECURSIVE: &str = "recursive";
const PARAM_DESTINATION: &str = "destination";
const PARAM_OWNER: &str = "owner";
const PARAM_GROUP: &str = "group";
const PARAM_CREATE_PARENT: &str = "createParent";

pub const DEFAULT_PERMISSION: &str = "644";
pub const MIN_BUFFER_SIZE: u32 = 4096;
pub const MIN_BLOCK_SIZE: u64 = 4096;
pub const MIN_READ_LENGTH: u64 = 1028;

lazy_static! {
    static ref PERMISSION_RE: Regex = Regex::new(r"^[0-7]{3}$").unwrap();
}

/// Bounds for numeric parameters, taken from configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParameterLimits {
    pub replication_min: u16,
    pub replication_max: u16,
    pub block_size_min: u64,
}

impl Default for ParameterLimits {
    fn default() -> Self {
        ParameterLimits {
            replication_min: 1,
            replication_max: 10,
            block_size_min: 1048576,
        }
    }
}

fn default_permission() -> String {
    DEFAULT_PERMISSION.to_owned()
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreateParams {
    #[serde(rename = "overwrite", default)]
    pub overwrite: bool,
    #[serde(rename = "blocksize", default)]
    pub block_size: Option<u64>,
    #[serde(rename = "buffersize", default)]
    pub buffer_size: Option<u32>,
    #[serde(rename = "replication", default)]
    pub replication: Option<u16>,
    #[serde(rename = "permission", default = "default_permission")]
    pub permission: String,
}

impl Default for CreateParams {
    fn default() -> Self {
        CreateParams {
            overwrite: false,
            block_size: None,
            buffer_size: None,
            replication: None,
            permission: default_permission(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AppendParams {
    #[serde(rename = "buffersize", default)]
    pub buffer_size: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadParams {
    #[serde(rename = "offset", default)]
    pub offset: Option<u64>,
    #[serde(rename = "length", default)]
    pub length: Option<u64>,
    #[serde(rename = "buffersize", default)]
    pub buffer_size: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ConcatParams {
    #[serde(
        rename = "sources",
        serialize_with = "serialize_comma_separated",
        deserialize_with = "deserialize_comma_separated"
    )]
    pub sources: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TruncateParams {
    #[serde(rename = "newlength")]
    pub new_length: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct DeleteParams {
    #[serde(rename = "recursive", default)]
    pub recursive: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RenameParams {
    #[serde(rename = "destination")]
    pub destination: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct MkdirsParams {
    #[serde(rename = "permission", default)]
    pub permission: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PermissionParams {
    #[serde(rename = "permission")]
    pub permission: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnerParams {
    #[serde(rename = "owner", default)]
    pub owner: Option<String>,
    #[serde(rename = "group", default)]
    pub group: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplicationParams {
    #[serde(rename = "replication")]
    pub replication: u16,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SymlinkParams {
    #[serde(rename = "destination")]
    pub destination: String,
    #[serde(rename = "createParent", default)]
    pub create_parent: bool,
}

fn serialize_comma_separated<S>(v: &[String], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&v.join(","))
}

fn deserialize_comma_separated<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(split_comma_separated(&s))
}

fn split_comma_separated(s: &str) -> Vec<String> {
    if s.is_empty() {
        return Vec::new();
    }
    s.split(',').map(|s| s.to_owned()).collect()
}

/// Operation-specific parameters, one shape per operation that takes any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestParameters {
    Create(CreateParams),
    Append(AppendParams),
    Read(ReadParams),
    Concat(ConcatParams),
    Truncate(TruncateParams),
    Delete(DeleteParams),
    Rename(RenameParams),
    Mkdirs(MkdirsParams),
    SetPermission(PermissionParams),
    SetOwner(OwnerParams),
    SetReplication(ReplicationParams),
    CreateSymlink(SymlinkParams),
}

impl RequestParameters {
    /// The operation this parameter shape belongs to.
    pub fn operation(&self) -> OperationName {
        match self {
            RequestParameters::Create(_) => OperationName::Create,
            RequestParameters::Append(_) => OperationName::Append,
            RequestParameters::Read(_) => OperationName::Open,
            RequestParameters::Concat(_) => OperationName::Concat,
            RequestParameters::Truncate(_) => OperationName::Truncate,
            RequestParameters::Delete(_) => OperationName::Delete,
            RequestParameters::Rename(_) => OperationName::Rename,
            RequestParameters::Mkdirs(_) => OperationName::Mkdirs,
            RequestParameters::SetPermission(_) => OperationName::SetPermission,
            RequestParameters::SetOwner(_) => OperationName::SetOwner,
            RequestParameters::SetReplication(_) => OperationName::SetReplication,
            RequestParameters::CreateSymlink(_) => OperationName::CreateSymlink,
        }
    }

    /// Parameters sent when the caller supplies none.
    pub fn default_for(operation: OperationName) -> Option<RequestParameters> {
        match operation {
            OperationName::Append => Some(RequestParameters::Append(AppendParams::default())),
            OperationName::Mkdirs => Some(RequestParameters::Mkdirs(MkdirsParams::default())),
            OperationName::Delete => Some(RequestParameters::Delete(DeleteParams::default())),
            _ => None,
        }
    }

    /// Serializes into query pairs. Absent optional fields are omitted.
    pub fn encode(&self) -> Result<Vec<(&'static str, String)>, OperationError> {
        let mut pairs = Vec::new();
        match self {
            RequestParameters::Create(p) => {
                pairs.push((PARAM_DATA, true.to_string()));
                pairs.push((PARAM_OVERWRITE, p.overwrite.to_string()));
                push_opt(&mut pairs, PARAM_BLOCK_SIZE, &p.block_size);
                push_opt(&mut pairs, PARAM_BUFFER_SIZE, &p.buffer_size);
                push_opt(&mut pairs, PARAM_REPLICATION, &p.replication);
                pairs.push((PARAM_PERMISSION, p.permission.clone()));
            }
            RequestParameters::Append(p) => {
                pairs.push((PARAM_DATA, true.to_string()));
                push_opt(&mut pairs, PARAM_BUFFER_SIZE, &p.buffer_size);
            }
            RequestParameters::Read(p) => {
                push_opt(&mut pairs, PARAM_OFFSET, &p.offset);
                push_opt(&mut pairs, PARAM_LENGTH, &p.length);
                push_opt(&mut pairs, PARAM_BUFFER_SIZE, &p.buffer_size);
            }
            RequestParameters::Concat(p) => {
                if let Some(s) = p.sources.iter().find(|s| s.contains(',')) {
                    return Err(OperationError::EncodingError(format!(
                        "a source path cannot contain a comma: {}",
                        s
                    )));
                }
                pairs.push((PARAM_SOURCES, p.sources.join(",")));
            }
            RequestParameters::Truncate(p) => {
                pairs.push((PARAM_NEW_LENGTH, p.new_length.to_string()));
            }
            RequestParameters::Delete(p) => {
                pairs.push((PARAM_RECURSIVE, p.recursive.to_string()));
            }
            RequestParameters::Rename(p) => {
                pairs.push((PARAM_DESTINATION, p.destination.clone()));
            }
            RequestParameters::Mkdirs(p) => {
                push_opt(&mut pairs, PARAM_PERMISSION, &p.permission);
            }
            RequestParameters::SetPermission(p) => {
                pairs.push((PARAM_PERMISSION, p.permission.clone()));
            }
            RequestParameters::SetOwner(p) => {
                push_opt(&mut pairs, PARAM_OWNER, &p.owner);
                push_opt(&mut pairs, PARAM_GROUP, &p.group);
            }
            RequestParameters::SetReplication(p) => {
                pairs.push((PARAM_REPLICATION, p.replication.to_string()));
            }
            RequestParameters::CreateSymlink(p) => {
                pairs.push((PARAM_DESTINATION, p.destination.clone()));
                pairs.push((PARAM_CREATE_PARENT, p.create_parent.to_string()));
            }
        }
        Ok(pairs)
    }

    /// Parses query pairs (as produced by `encode`) back into the shape of `operation`.
    pub fn decode<K, V>(operation: OperationName, pairs: &[(K, V)]) -> Result<Self, OperationError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let q = QueryPairs(pairs);
        let params = match operation {
            OperationName::Create => RequestParameters::Create(CreateParams {
                overwrite: q.parse(PARAM_OVERWRITE)?.unwrap_or(false),
                block_size: q.parse(PARAM_BLOCK_SIZE)?,
                buffer_size: q.parse(PARAM_BUFFER_SIZE)?,
                replication: q.parse(PARAM_REPLICATION)?,
                permission: q.string(PARAM_PERMISSION).unwrap_or_else(default_permission),
            }),
            OperationName::Append => RequestParameters::Append(AppendParams {
                buffer_size: q.parse(PARAM_BUFFER_SIZE)?,
            }),
            OperationName::Open => RequestParameters::Read(ReadParams {
                offset: q.parse(PARAM_OFFSET)?,
                length: q.parse(PARAM_LENGTH)?,
                buffer_size: q.parse(PARAM_BUFFER_SIZE)?,
            }),
            OperationName::Concat => RequestParameters::Concat(ConcatParams {
                sources: split_comma_separated(&q.required(PARAM_SOURCES)?),
            }),
            OperationName::Truncate => RequestParameters::Truncate(TruncateParams {
                new_length: q.parse_required(PARAM_NEW_LENGTH)?,
            }),
            OperationName::Delete => RequestParameters::Delete(DeleteParams {
                recursive: q.parse(PARAM_RECURSIVE)?.unwrap_or(false),
            }),
            OperationName::Rename => RequestParameters::Rename(RenameParams {
                destination: q.required(PARAM_DESTINATION)?,
            }),
            OperationName::Mkdirs => RequestParameters::Mkdirs(MkdirsParams {
                permission: q.string(PARAM_PERMISSION),
            }),
            OperationName::SetPermission => RequestParameters::SetPermission(PermissionParams {
                permission: q.required(PARAM_PERMISSION)?,
            }),
            OperationName::SetOwner => RequestParameters::SetOwner(OwnerParams {
                owner: q.string(PARAM_OWNER),
                group: q.string(PARAM_GROUP),
            }),
            OperationName::SetReplication => {
                RequestParameters::SetReplication(ReplicationParams {
                    replication: q.parse_required(PARAM_REPLICATION)?,
                })
            }
            OperationName::CreateSymlink => RequestParameters::CreateSymlink(SymlinkParams {
                destination: q.required(PARAM_DESTINATION)?,
                create_parent: q.parse(PARAM_CREATE_PARENT)?.unwrap_or(false),
            }),
            op => {
                return Err(OperationError::InvalidArgument(format!(
                    "the operation [{}] takes no parameters",
                    op
                )))
            }
        };
        Ok(params)
    }

    /// Checks field-level constraints before a request is built.
    pub fn validate(&self, limits: &ParameterLimits) -> Result<(), OperationError> {
        match self {
            RequestParameters::Create(p) => {
                check_permission(&p.permission)?;
                if let Some(block_size) = p.block_size {
                    check_block_size(block_size, limits)?;
                }
                if let Some(buffer_size) = p.buffer_size {
                    check_buffer_size(buffer_size)?;
                }
                if let Some(replication) = p.replication {
                    check_replication(replication, limits)?;
                }
            }
            RequestParameters::Append(p) => {
                if let Some(buffer_size) = p.buffer_size {
                    check_buffer_size(buffer_size)?;
                }
            }
            RequestParameters::Read(p) => {
                if let Some(length) = p.length {
                    if length < MIN_READ_LENGTH {
                        return Err(invalid(format!(
                            "length must be at least {}",
                            MIN_READ_LENGTH
                        )));
                    }
                }
                if let Some(buffer_size) = p.buffer_size {
                    check_buffer_size(buffer_size)?;
                }
            }
            RequestParameters::Concat(p) => {
                if p.sources.is_empty() {
                    return Err(invalid("expected at least one source file"));
                }
                for source in &p.sources {
                    check_file_path(source, false)?;
                }
                let dir = parent_directory(&p.sources[0]);
                if p.sources.iter().any(|s| parent_directory(s) != dir) {
                    return Err(invalid("source files must be in same directory"));
                }
            }
            RequestParameters::Truncate(_) | RequestParameters::Delete(_) => {}
            RequestParameters::Rename(p) => {
                check_file_path(&p.destination, false)?;
            }
            RequestParameters::Mkdirs(p) => {
                if let Some(permission) = &p.permission {
                    check_permission(permission)?;
                }
            }
            RequestParameters::SetPermission(p) => {
                check_permission(&p.permission)?;
            }
            RequestParameters::SetOwner(p) => {
                let has_owner = p.owner.as_deref().map_or(false, |s| !s.is_empty());
                let has_group = p.group.as_deref().map_or(false, |s| !s.is_empty());
                if !has_owner && !has_group {
                    return Err(invalid("expected an owner or a group"));
                }
            }
            RequestParameters::SetReplication(p) => {
                check_replication(p.replication, limits)?;
            }
            RequestParameters::CreateSymlink(p) => {
                check_file_path(&p.destination, false)?;
            }
        }
        Ok(())
    }
}

fn invalid<S: Into<String>>(msg: S) -> OperationError {
    OperationError::InvalidArgument(msg.into())
}

fn push_opt<T: ToString>(
    pairs: &mut Vec<(&'static str, String)>,
    key: &'static str,
    v: &Option<T>,
) {
    if let Some(v) = v {
        pairs.push((key, v.to_string()));
    }
}

fn check_permission(permission: &str) -> Result<(), OperationError> {
    if !PERMISSION_RE.is_match(permission) {
        return Err(invalid(format!(
            "permission must be an octal triplet: {}",
            permission
        )));
    }
    Ok(())
}

fn check_buffer_size(buffer_size: u32) -> Result<(), OperationError> {
    if buffer_size < MIN_BUFFER_SIZE {
        return Err(invalid(format!(
            "buffer size must be at least {}",
            MIN_BUFFER_SIZE
        )));
    }
    Ok(())
}

fn check_block_size(block_size: u64, limits: &ParameterLimits) -> Result<(), OperationError> {
    let min = limits.block_size_min.max(MIN_BLOCK_SIZE);
    if block_size < min {
        return Err(invalid(format!("block size must be at least {}", min)));
    }
    Ok(())
}

fn check_replication(replication: u16, limits: &ParameterLimits) -> Result<(), OperationError> {
    if replication < limits.replication_min || replication > limits.replication_max {
        return Err(invalid(format!(
            "replication must be in [{}, {}]",
            limits.replication_min, limits.replication_max
        )));
    }
    Ok(())
}

struct QueryPairs<'a, K, V>(&'a [(K, V)]);

impl<'a, K: AsRef<str>, V: AsRef<str>> QueryPairs<'a, K, V> {
    fn get(&self, key: &str) -> Option<&'a str> {
        self.0
            .iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, v)| v.as_ref())
    }

    fn string(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_owned())
    }

    fn required(&self, key: &str) -> Result<String, OperationError> {
        self.string(key)
            .ok_or_else(|| invalid(format!("missing parameter: {}", key)))
    }

    fn parse<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, OperationError> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .parse::<T>()
                .map(Some)
                .map_err(|_| invalid(format!("invalid value for parameter {}: {}", key, v))),
        }
    }

    fn parse_required<T: std::str::FromStr>(&self, key: &str) -> Result<T, OperationError> {
        self.parse(key)?
            .ok_or_else(|| invalid(format!("missing parameter: {}", key)))
    }
}
