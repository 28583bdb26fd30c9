//! Character-state distributions attached to graph nodes.
//!
//! The graph stores these opaquely; they come from the external inference
//! step. The variant is explicit so callers match on it instead of probing.

use crate::error::PogError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One weighted component of a Gaussian mixture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianComponent {
    pub weight: f64,
    pub mean: f64,
    pub stddev: f64,
}

/// A per-position state distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    /// Probability per character.
    Categorical { probs: BTreeMap<char, f64> },
    /// Mixture over a continuous value.
    GaussianMixture { components: Vec<GaussianComponent> },
    /// A single real value.
    PointEstimate { value: f64 },
}

impl Distribution {
    /// Builds a categorical distribution from `(char, probability)` pairs.
    pub fn categorical(probs: impl IntoIterator<Item = (char, f64)>) -> Self {
        Distribution::Categorical {
            probs: probs.into_iter().collect(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Distribution::Categorical { .. } => "categorical",
            Distribution::GaussianMixture { .. } => "gaussian_mixture",
            Distribution::PointEstimate { .. } => "point_estimate",
        }
    }

    /// The most probable character of a categorical distribution.
    ///
    /// Ties go to the smallest character. Other kinds have no character.
    pub fn most_likely(&self) -> Option<char> {
        match self {
            Distribution::Categorical { probs } => probs
                .iter()
                .fold(None, |best: Option<(char, f64)>, (&c, &p)| match best {
                    Some((_, bp)) if bp >= p => best,
                    _ => Some((c, p)),
                })
                .map(|(c, _)| c),
            _ => None,
        }
    }
}

// Compact single-line form used in DOT annotations:
//   cat:A=0.5;C=0.5   gmm:0.4/1.5/0.2;0.6/3/0.5   point:2.5
impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distribution::Categorical { probs } => {
                let parts: Vec<String> = probs.iter().map(|(c, p)| format!("{}={}", c, p)).collect();
                write!(f, "cat:{}", parts.join(";"))
            }
            Distribution::GaussianMixture { components } => {
                let parts: Vec<String> = components
                    .iter()
                    .map(|g| format!("{}/{}/{}", g.weight, g.mean, g.stddev))
                    .collect();
                write!(f, "gmm:{}", parts.join(";"))
            }
            Distribution::PointEstimate { value } => write!(f, "point:{}", value),
        }
    }
}

impl FromStr for Distribution {
    type Err = PogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || PogError::MalformedDistribution(s.to_string());
        let number = |text: &str| text.trim().parse::<f64>().map_err(|_| malformed());

        let (kind, body) = s.split_once(':').ok_or_else(malformed)?;
        let parts = || body.split(';').filter(|p| !p.is_empty());

        match kind {
            "cat" => {
                let mut probs = BTreeMap::new();
                for part in parts() {
                    let (c, p) = part.split_once('=').ok_or_else(malformed)?;
                    let mut chars = c.chars();
                    let c = match (chars.next(), chars.next()) {
                        (Some(c), None) => c,
                        _ => return Err(malformed()),
                    };
                    probs.insert(c, number(p)?);
                }
                Ok(Distribution::Categorical { probs })
            }
            "gmm" => {
                let mut components = Vec::new();
                for part in parts() {
                    let fields: Vec<&str> = part.split('/').collect();
                    if fields.len() != 3 {
                        return Err(malformed());
                    }
                    components.push(GaussianComponent {
                        weight: number(fields[0])?,
                        mean: number(fields[1])?,
                        stddev: number(fields[2])?,
                    });
                }
                Ok(Distribution::GaussianMixture { components })
            }
            "point" => Ok(Distribution::PointEstimate {
                value: number(body)?,
            }),
            _ => Err(malformed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_likely() {
        let d = Distribution::categorical([('A', 0.2), ('C', 0.5), ('G', 0.3)]);
        assert_eq!(d.most_likely(), Some('C'));

        let tie = Distribution::categorical([('T', 0.5), ('A', 0.5)]);
        assert_eq!(tie.most_likely(), Some('A'));

        assert_eq!(Distribution::PointEstimate { value: 1.0 }.most_likely(), None);
    }

    #[test]
    fn test_annotation_text() {
        let d = Distribution::GaussianMixture {
            components: vec![
                GaussianComponent { weight: 0.4, mean: 1.5, stddev: 0.2 },
                GaussianComponent { weight: 0.6, mean: 3.0, stddev: 0.5 },
            ],
        };
        assert_eq!(d.to_string(), "gmm:0.4/1.5/0.2;0.6/3/0.5");
        assert_eq!(d.to_string().parse::<Distribution>().unwrap(), d);

        let p: Distribution = "point:2.5".parse().unwrap();
        assert_eq!(p, Distribution::PointEstimate { value: 2.5 });

        let c: Distribution = "cat:A=0.25;C=0.75".parse().unwrap();
        assert_eq!(c.most_likely(), Some('C'));
    }

    #[test]
    fn test_malformed_annotation() {
        assert!("beta:1".parse::<Distribution>().is_err());
        assert!("cat:AC=0.5".parse::<Distribution>().is_err());
        assert!("gmm:0.5/1".parse::<Distribution>().is_err());
        assert!("point:x".parse::<Distribution>().is_err());
    }
}
