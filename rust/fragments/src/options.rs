// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Call options.

use serde::{Deserialize, Serialize};

/// Options of [`crate::edit`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditOptions {
    /// Skip zlib compression of the output.
    pub raw: bool,
    /// Emit only the entities the batch touches instead of the whole model.
    pub delta: bool,
}

/// Options of [`crate::new_model`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelOptions {
    pub raw: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default_to_compressed_full_edits() {
        let options: EditOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, EditOptions::default());
        assert!(!options.raw && !options.delta);

        let options: EditOptions = serde_json::from_str(r#"{"raw":true,"delta":true}"#).unwrap();
        assert!(options.raw && options.delta);
    }
}
