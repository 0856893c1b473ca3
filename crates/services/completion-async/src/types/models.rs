use serde::{Deserialize, Serialize};

/// Per-token prices as decimal strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    /// Price per prompt token
    #[serde(default)]
    pub prompt: Option<String>,
    /// Price per completion token
    #[serde(default)]
    pub completion: Option<String>,
}

impl Pricing {
    /// Both prices parse as zero
    #[must_use]
    pub fn is_free(&self) -> bool {
        let zero = |p: &Option<String>| {
            p.as_deref()
                .and_then(|v| v.parse::<f64>().ok())
                .is_some_and(|v| v == 0.0)
        };
        zero(&self.prompt) && zero(&self.completion)
    }
}

/// One model advertised by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteModel {
    /// Model id
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Context window in tokens
    #[serde(default)]
    pub context_length: Option<u64>,
    /// Prices
    #[serde(default)]
    pub pricing: Option<Pricing>,
}

/// Body of `GET /models`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelListResponse {
    /// Models
    #[serde(default)]
    pub data: Vec<RemoteModel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_pricing_detection() {
        let free = Pricing {
            prompt: Some("0".into()),
            completion: Some("0.0".into()),
        };
        assert!(free.is_free());
        let paid = Pricing {
            prompt: Some("0.000001".into()),
            completion: Some("0".into()),
        };
        assert!(!paid.is_free());
        assert!(!Pricing::default().is_free());
    }
}
