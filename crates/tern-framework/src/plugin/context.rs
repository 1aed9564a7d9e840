use serde_json::{Map, Value};

use crate::client::Client;

/// Context passed to a plugin's enable routine.
///
/// Gives access to the client facade (to append middleware and register
/// exception handlers) and to the plugin's merged options.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(serde::Deserialize)]
/// struct RetryOptions { attempts: u32 }
///
/// async fn enable(ctx: PluginContext) -> Result<Option<Capability>, BoxError> {
///     let opts: RetryOptions = ctx.get_options()?;
///     info!("attempts = {}", opts.attempts);
///     Ok(None)
/// }
/// ```
#[derive(Clone, Debug)]
pub struct PluginContext {
    client: Client,
    name: String,
    options: Map<String, Value>,
}

impl PluginContext {
    pub(crate) fn new(client: Client, name: String, options: Map<String, Value>) -> Self {
        Self {
            client,
            name,
            options,
        }
    }

    /// The client facade the plugin is installed into.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The plugin's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The merged options.
    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    /// Deserialise the merged options into `T`.
    ///
    /// Returns `Err` if required fields are missing or have the wrong shape;
    /// use `#[serde(default)]` on the struct to make all fields optional.
    pub fn get_options<T>(&self) -> serde_json::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        T::deserialize(&Value::Object(self.options.clone()))
    }
}

/// Shallow-merges object layers; later layers win. Non-object layers are
/// skipped.
pub(crate) fn merge_options<'a>(
    base: &Map<String, Value>,
    layers: impl IntoIterator<Item = &'a Value>,
) -> Map<String, Value> {
    let mut merged = base.clone();
    for layer in layers {
        if let Value::Object(map) = layer {
            for (key, value) in map {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    merged
}
