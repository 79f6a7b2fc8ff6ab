//! Scalar value generators used for heights, counts, distances and angles.

use std::sync::atomic::{AtomicU64, Ordering};

use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use super::context::DesignContext;
use super::metadata::MetaValue;
use crate::error::{DesignError, DesignResult};

/// Identity of a generator, used to key memoised draws in a [`DesignContext`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ValueId(u64);

impl ValueId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ValueId {
    fn default() -> Self {
        Self::next()
    }
}

fn default_vary() -> bool {
    true
}

/// Declarative form of a value generator.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueSpec {
    Constant {
        value: f32,
    },
    Uniform {
        min: f32,
        max: f32,
        #[serde(default = "default_vary")]
        vary: bool,
    },
    /// Normal distribution clamped into `[min, max]`. Mean defaults to the
    /// midpoint and deviation to a quarter of the range.
    Normal {
        min: f32,
        max: f32,
        #[serde(default)]
        mean: Option<f32>,
        #[serde(default)]
        deviation: Option<f32>,
        #[serde(default = "default_vary")]
        vary: bool,
    },
    /// Read `key` from metadata, or draw `fallback` and store it there.
    Meta {
        key: String,
        fallback: Box<ValueGenerator>,
    },
}

/// A value generator with its memoisation identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "ValueSpec", into = "ValueSpec")]
pub struct ValueGenerator {
    id: ValueId,
    spec: ValueSpec,
}

impl From<ValueSpec> for ValueGenerator {
    fn from(spec: ValueSpec) -> Self {
        Self {
            id: ValueId::next(),
            spec,
        }
    }
}

impl From<ValueGenerator> for ValueSpec {
    fn from(generator: ValueGenerator) -> Self {
        generator.spec
    }
}

impl ValueGenerator {
    pub fn constant(value: f32) -> Self {
        ValueSpec::Constant { value }.into()
    }

    pub fn uniform(min: f32, max: f32) -> Self {
        ValueSpec::Uniform {
            min,
            max,
            vary: true,
        }
        .into()
    }

    pub fn normal(min: f32, max: f32) -> Self {
        ValueSpec::Normal {
            min,
            max,
            mean: None,
            deviation: None,
            vary: true,
        }
        .into()
    }

    pub fn meta(key: impl Into<String>, fallback: ValueGenerator) -> Self {
        ValueSpec::Meta {
            key: key.into(),
            fallback: Box::new(fallback),
        }
        .into()
    }

    /// Set whether each evaluation draws afresh. Ignored by constant and
    /// meta generators.
    pub fn with_vary(mut self, value: bool) -> Self {
        match &mut self.spec {
            ValueSpec::Uniform { vary, .. } | ValueSpec::Normal { vary, .. } => *vary = value,
            ValueSpec::Constant { .. } | ValueSpec::Meta { .. } => {}
        }
        self
    }

    pub fn spec(&self) -> &ValueSpec {
        &self.spec
    }

    /// Smallest value this generator can produce.
    pub fn min_value(&self) -> f32 {
        match &self.spec {
            ValueSpec::Constant { value } => *value,
            ValueSpec::Uniform { min, .. } | ValueSpec::Normal { min, .. } => *min,
            ValueSpec::Meta { fallback, .. } => fallback.min_value(),
        }
    }

    /// Largest value this generator can produce.
    pub fn max_value(&self) -> f32 {
        match &self.spec {
            ValueSpec::Constant { value } => *value,
            ValueSpec::Uniform { max, .. } | ValueSpec::Normal { max, .. } => *max,
            ValueSpec::Meta { fallback, .. } => fallback.max_value(),
        }
    }

    pub fn select_float(&self, ctx: &mut DesignContext) -> DesignResult<f32> {
        match &self.spec {
            ValueSpec::Constant { value } => Ok(*value),
            ValueSpec::Uniform { min, max, vary } => {
                self.draw(ctx, *vary, |ctx| Ok(min + ctx.random() * (max - min)))
            }
            ValueSpec::Normal {
                min,
                max,
                mean,
                deviation,
                vary,
            } => self.draw(ctx, *vary, |ctx| {
                let mean = mean.unwrap_or((min + max) * 0.5);
                let deviation = deviation.unwrap_or((max - min) * 0.25);
                let normal = Normal::new(mean, deviation)
                    .map_err(|e| DesignError::malformed(format!("normal value: {e}")))?;
                Ok(normal.sample(&mut *ctx.rng).clamp(*min, *max))
            }),
            ValueSpec::Meta { key, fallback } => {
                if let Some(value) = ctx.metadata.get_float(key) {
                    return Ok(value);
                }
                let value = fallback.select_float(ctx)?;
                ctx.metadata.set(key.clone(), MetaValue::Float(value));
                Ok(value)
            }
        }
    }

    /// Draw a float and round it into `[ceil(min), floor(max)]`.
    pub fn select_int(&self, ctx: &mut DesignContext) -> DesignResult<i32> {
        if let ValueSpec::Meta { key, fallback } = &self.spec {
            if let Some(value) = ctx.metadata.get_int(key) {
                return Ok(value);
            }
            let value = fallback.select_int(ctx)?;
            ctx.metadata.set(key.clone(), MetaValue::Int(value));
            return Ok(value);
        }

        let (min, max) = (self.min_value(), self.max_value());
        let (low, high) = (min.ceil(), max.floor());
        if low > high {
            return Err(DesignError::InvalidRange { min, max });
        }

        let value = self.select_float(ctx)?;
        Ok(value.round().clamp(low, high) as i32)
    }

    fn draw(
        &self,
        ctx: &mut DesignContext,
        vary: bool,
        sample: impl FnOnce(&mut DesignContext) -> DesignResult<f32>,
    ) -> DesignResult<f32> {
        if !vary {
            if let Some(value) = ctx.memoized(self.id) {
                return Ok(value);
            }
        }

        let value = sample(ctx)?;
        if !vary {
            ctx.memoize(self.id, value);
        }
        Ok(value)
    }

    /// Check the generator's shape before any value is drawn.
    pub fn validate(&self, what: &str) -> DesignResult<()> {
        match &self.spec {
            ValueSpec::Constant { value } if !value.is_finite() => Err(DesignError::malformed(
                format!("{what}: constant is not finite"),
            )),
            ValueSpec::Constant { .. } => Ok(()),
            ValueSpec::Uniform { min, max, .. } | ValueSpec::Normal { min, max, .. }
                if !(min.is_finite() && max.is_finite()) || min > max =>
            {
                Err(DesignError::malformed(format!(
                    "{what}: range [{min}, {max}] is invalid"
                )))
            }
            ValueSpec::Normal {
                deviation: Some(deviation),
                ..
            } if !(*deviation >= 0.0) => Err(DesignError::malformed(format!(
                "{what}: deviation {deviation} is negative"
            ))),
            ValueSpec::Uniform { .. } | ValueSpec::Normal { .. } => Ok(()),
            ValueSpec::Meta { key, .. } if key.is_empty() => {
                Err(DesignError::malformed(format!("{what}: meta key is empty")))
            }
            ValueSpec::Meta { fallback, .. } => fallback.validate(what),
        }
    }
}
