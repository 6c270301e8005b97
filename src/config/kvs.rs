use anyhow::bail;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct KV {
    pub key: String,
    pub value: String,
}

#[derive(Default, Clone, Debug)]
pub struct KVS(pub Vec<KV>);

impl KVS {
    pub fn iter(&self) -> std::slice::Iter<'_, KV> {
        self.0.iter()
    }

    // Sets a key value pair.
    pub fn set(&mut self, key: String, value: String) {
        match self.0.iter_mut().find(|kv| kv.key == key) {
            Some(kv) => {
                kv.value = value;
            }
            None => self.0.push(KV { key, value }),
        }
    }

    pub fn get(&self, key: &str) -> &str {
        self.lookup(key).unwrap_or("")
    }

    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|&kv| kv.key == key)
            .map(|kv| kv.value.as_str())
    }
}

// Fails on any key of `kvs` that has no default.
pub fn check_valid_keys(kvs: &KVS, default_kvs: &KVS) -> anyhow::Result<()> {
    let invalid: Vec<&str> = kvs
        .iter()
        .filter(|kv| default_kvs.lookup(&kv.key).is_none())
        .map(|kv| kv.key.as_str())
        .collect();
    if !invalid.is_empty() {
        bail!("found invalid keys ({}) for the proxy config", invalid.join(","));
    }
    Ok(())
}
