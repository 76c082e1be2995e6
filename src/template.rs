//! Jinja-style metric templates backed by the generator library.
//!
//! A template is parsed once when the endpoint is loaded and rendered fresh
//! on every scrape. The generator functions below are registered as globals:
//!
//! - `increase(key, step=1.0, start=0.0)`
//! - `reset(key)`
//! - `chance(key, probability=0.01, step=1.0, start=0.0)`
//! - `increase_or_reset(key, step=1.0, start=0.0, reset_probability=0.05)`
//!
//! `step_size` and `start_value` are accepted as aliases of `step` and `start`.

use std::{fmt, fs, io, path::Path, sync::Arc};

use minijinja::{context, value::Kwargs, Environment, Error as JinjaError, ErrorKind};
use thiserror::Error;

use crate::generators::{
    GeneratorError, GeneratorStore, DEFAULT_PROBABILITY, DEFAULT_RESET_PROBABILITY, DEFAULT_START, DEFAULT_STEP,
};

const TEMPLATE_NAME: &str = "metrics";

/// Errors while loading or rendering a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// I/O error while reading the template file.
    #[error("io: {0}")]
    Io(#[from] io::Error),
    /// The template source does not parse.
    #[error("syntax: {0}")]
    Syntax(#[source] JinjaError),
    /// Evaluation failed, e.g. a generator rejected its arguments.
    #[error("render: {0}")]
    Render(#[source] JinjaError),
}

/// A parsed template with the generator library bound to a shared store.
pub struct TemplateHandle {
    env: Environment<'static>,
    store: Arc<GeneratorStore>,
}

impl fmt::Debug for TemplateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateHandle").field("store", &self.store).finish_non_exhaustive()
    }
}

impl TemplateHandle {
    /// Read and parse a template file.
    ///
    /// # Parameters
    ///
    /// - `path` - Template file
    /// - `store` - Generator state shared with every other template endpoint
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Io`] if the file cannot be read and
    /// [`TemplateError::Syntax`] if it does not parse.
    pub fn load_from_path(
        path: impl AsRef<Path>,
        store: Arc<GeneratorStore>,
    ) -> Result<Self, TemplateError> {
        let source = fs::read_to_string(path)?;
        Self::from_source(source, store)
    }

    /// Parse a template from source text.
    pub fn from_source(
        source: impl Into<String>,
        store: Arc<GeneratorStore>,
    ) -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        register_generators(&mut env, &store);
        env.add_template_owned(TEMPLATE_NAME, source.into()).map_err(TemplateError::Syntax)?;
        Ok(Self { env, store })
    }

    /// Evaluate the template once, running every generator call it contains.
    ///
    /// # Returns
    ///
    /// Returns the rendered text with surrounding whitespace trimmed.
    pub fn render(&self) -> Result<String, TemplateError> {
        let rendered = self
            .env
            .get_template(TEMPLATE_NAME)
            .and_then(|template| template.render(context! {}))
            .map_err(TemplateError::Render)?;
        Ok(rendered.trim().to_string())
    }
}

/// Register the generator functions as template globals.
pub fn register_generators(env: &mut Environment<'_>, store: &Arc<GeneratorStore>) {
    let s = store.clone();
    env.add_function("increase", move |key: String, kwargs: Kwargs| -> Result<f64, JinjaError> {
        let step = float_arg(&kwargs, "step", Some("step_size"), DEFAULT_STEP)?;
        let start = float_arg(&kwargs, "start", Some("start_value"), DEFAULT_START)?;
        kwargs.assert_all_used()?;
        s.increase(&key, step, start).map_err(invalid_argument)
    });

    let s = store.clone();
    env.add_function("reset", move |key: String| -> f64 { s.reset(&key) });

    let s = store.clone();
    env.add_function("chance", move |key: String, kwargs: Kwargs| -> Result<f64, JinjaError> {
        let probability = float_arg(&kwargs, "probability", None, DEFAULT_PROBABILITY)?;
        let step = float_arg(&kwargs, "step", Some("step_size"), DEFAULT_STEP)?;
        let start = float_arg(&kwargs, "start", Some("start_value"), DEFAULT_START)?;
        kwargs.assert_all_used()?;
        s.chance(&key, probability, step, start).map_err(invalid_argument)
    });

    let s = store.clone();
    env.add_function(
        "increase_or_reset",
        move |key: String, kwargs: Kwargs| -> Result<f64, JinjaError> {
            let step = float_arg(&kwargs, "step", Some("step_size"), DEFAULT_STEP)?;
            let start = float_arg(&kwargs, "start", Some("start_value"), DEFAULT_START)?;
            let reset_probability =
                float_arg(&kwargs, "reset_probability", None, DEFAULT_RESET_PROBABILITY)?;
            kwargs.assert_all_used()?;
            s.increase_or_reset(&key, step, start, reset_probability).map_err(invalid_argument)
        },
    );
}

fn invalid_argument(err: GeneratorError) -> JinjaError {
    JinjaError::new(ErrorKind::InvalidOperation, err.to_string())
}

fn float_arg(
    kwargs: &Kwargs,
    name: &str,
    alias: Option<&str>,
    default: f64,
) -> Result<f64, JinjaError> {
    if let Some(value) = kwargs.get::<Option<f64>>(name)? {
        return Ok(value);
    }
    if let Some(alias) = alias {
        if let Some(value) = kwargs.get::<Option<f64>>(alias)? {
            return Ok(value);
        }
    }
    Ok(default)
}
