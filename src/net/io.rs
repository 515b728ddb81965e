//! I/O 支持：以 JSON 或 RON 描述网结构，并逐元素加载到引擎中。
//!
//! 加载时单个元素出错（重复 id、未知节点、非法连接）只记录警告并跳过，
//! 不会中止整个加载。弧在所有节点创建之后再解析。
use std::fs;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::net::core::NetError;
use crate::net::petri_net::{EngineConfig, PetriNet};
use crate::net::structure::Tokens;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ron error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceSpec {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tokens: Tokens,
    #[serde(default)]
    pub position: Option<(i32, i32)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub position: Option<(i32, i32)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcSpec {
    pub id: String,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetDescription {
    #[serde(default)]
    pub places: Vec<PlaceSpec>,
    #[serde(default)]
    pub transitions: Vec<TransitionSpec>,
    #[serde(default)]
    pub arcs: Vec<ArcSpec>,
}

impl NetDescription {
    /// 构建引擎，返回被跳过的元素所产生的错误。
    pub fn build(&self, config: EngineConfig) -> (PetriNet, Vec<NetError>) {
        let mut net = PetriNet::new(config);
        let mut skipped = Vec::new();
        let mut record = |result: Result<(), NetError>, what: &str| {
            if let Err(err) = result {
                warn!("skipping {}: {}", what, err);
                skipped.push(err);
            }
        };

        for place in &self.places {
            record(net.add_place(&place.id), "place");
        }
        for transition in &self.transitions {
            record(net.add_transition(&transition.id), "transition");
        }
        for place in &self.places {
            if let Some(name) = &place.name {
                record(net.set_node_name(&place.id, name), "place name");
            }
            if let Some((x, y)) = place.position {
                record(net.set_node_position(&place.id, x, y), "place position");
            }
        }
        for transition in &self.transitions {
            if let Some(name) = &transition.name {
                record(net.set_node_name(&transition.id, name), "transition name");
            }
            if let Some((x, y)) = transition.position {
                record(
                    net.set_node_position(&transition.id, x, y),
                    "transition position",
                );
            }
        }
        for arc in &self.arcs {
            record(net.add_arc(&arc.id, &arc.source, &arc.target), "arc");
        }

        net.reload_initial_tokens(
            self.places
                .iter()
                .map(|place| (place.id.as_str(), place.tokens)),
        );
        (net, skipped)
    }

    /// 只重新读取初始 token 数，不重建元素。
    pub fn reload_tokens(&self, net: &mut PetriNet) {
        net.reload_initial_tokens(
            self.places
                .iter()
                .map(|place| (place.id.as_str(), place.tokens)),
        );
    }
}

pub fn to_json_string<T>(value: &T) -> Result<String, IoError>
where
    T: Serialize,
{
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn from_json_str<T>(s: &str) -> Result<T, IoError>
where
    T: DeserializeOwned,
{
    Ok(serde_json::from_str(s)?)
}

pub fn from_ron_str<T>(s: &str) -> Result<T, IoError>
where
    T: DeserializeOwned,
{
    Ok(ron::from_str(s)?)
}

pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), IoError> {
    fs::write(path, to_json_string(value)?)?;
    Ok(())
}

/// 按扩展名选择格式：`.ron` 为 RON，其余按 JSON 解析。
pub fn read_description<P: AsRef<Path>>(path: P) -> Result<NetDescription, IoError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("ron") => from_ron_str(&content),
        _ => from_json_str(&content),
    }
}
