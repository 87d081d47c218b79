use serde::Serialize;
use std::collections::HashMap;

use crate::stt::EngineId;

/// Edges that follow the global auto-fallback flag unless overridden.
/// Every other edge is disabled until explicitly enabled.
pub const AUTO_EDGES: [(EngineId, EngineId); 4] = [
    (EngineId::RemoteApi, EngineId::LocalModel),
    (EngineId::RemoteApi, EngineId::StreamingDecoder),
    (EngineId::StreamingDecoder, EngineId::LocalModel),
    (EngineId::StreamingDecoder, EngineId::RemoteApi),
];

/// Declared order in which fallback candidates are tried for a primary.
pub fn candidate_order(primary: EngineId) -> [EngineId; 2] {
    match primary {
        EngineId::RemoteApi => [EngineId::LocalModel, EngineId::StreamingDecoder],
        EngineId::LocalModel => [EngineId::RemoteApi, EngineId::StreamingDecoder],
        EngineId::StreamingDecoder => [EngineId::LocalModel, EngineId::RemoteApi],
    }
}

/// Effective state of one directed edge, for status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackEdge {
    pub from: EngineId,
    pub to: EngineId,
    pub enabled: bool,
    pub explicit: bool,
}

/// Directed (failed engine -> candidate) permissions. Read-only once built.
#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    auto_fallback: bool,
    explicit: HashMap<(EngineId, EngineId), bool>,
}

impl FallbackPolicy {
    pub fn new(auto_fallback: bool) -> Self {
        Self {
            auto_fallback,
            explicit: HashMap::new(),
        }
    }

    /// Policy under which no edge is ever taken.
    pub fn disabled() -> Self {
        let mut policy = Self::new(false);
        for from in EngineId::ALL {
            for to in EngineId::ALL {
                if from != to {
                    policy.set_edge(from, to, false);
                }
            }
        }
        policy
    }

    pub fn with_edge(mut self, from: EngineId, to: EngineId, allowed: bool) -> Self {
        self.set_edge(from, to, allowed);
        self
    }

    pub fn set_edge(&mut self, from: EngineId, to: EngineId, allowed: bool) {
        if from != to {
            self.explicit.insert((from, to), allowed);
        }
    }

    pub fn auto_fallback(&self) -> bool {
        self.auto_fallback
    }

    pub fn is_auto_edge(from: EngineId, to: EngineId) -> bool {
        AUTO_EDGES.contains(&(from, to))
    }

    pub fn allows(&self, from: EngineId, to: EngineId) -> bool {
        if from == to {
            return false;
        }
        match self.explicit.get(&(from, to)) {
            Some(&allowed) => allowed,
            None => self.auto_fallback && Self::is_auto_edge(from, to),
        }
    }

    /// Allowed candidates for `primary`, in declared order.
    pub fn candidates(&self, primary: EngineId) -> Vec<EngineId> {
        candidate_order(primary)
            .into_iter()
            .filter(|&candidate| self.allows(primary, candidate))
            .collect()
    }

    /// Every directed edge with its effective flag.
    pub fn edges(&self) -> Vec<FallbackEdge> {
        let mut edges = Vec::with_capacity(6);
        for from in EngineId::ALL {
            for to in candidate_order(from) {
                edges.push(FallbackEdge {
                    from,
                    to,
                    enabled: self.allows(from, to),
                    explicit: self.explicit.contains_key(&(from, to)),
                });
            }
        }
        edges
    }

    /// Parse `from>to=on|off` overrides, comma separated.
    pub fn parse_edges(input: &str) -> Result<Vec<(EngineId, EngineId, bool)>, String> {
        let mut edges = Vec::new();
        for item in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (pair, flag) = item
                .split_once('=')
                .ok_or_else(|| format!("edge '{}' is missing '=on' or '=off'", item))?;
            let (from, to) = pair
                .split_once('>')
                .ok_or_else(|| format!("edge '{}' must look like from>to", item))?;
            let from: EngineId = from.parse()?;
            let to: EngineId = to.parse()?;
            if from == to {
                return Err(format!("edge '{}' points at itself", item));
            }
            let allowed = match flag.trim().to_ascii_lowercase().as_str() {
                "on" | "true" | "1" | "yes" => true,
                "off" | "false" | "0" | "no" => false,
                other => return Err(format!("edge '{}' has invalid flag '{}'", item, other)),
            };
            edges.push((from, to, allowed));
        }
        Ok(edges)
    }
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self::new(true)
    }
}
