//! Settings store: tagged key/value configuration.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::db::Store;
use super::error::StoreError;
use super::schema::default_kind;

/// A setting value with its kind recorded explicitly.
///
/// The kind decides how the stored text is read back, so a string that
/// merely starts with `{` stays a string.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Text(String),
    Number(serde_json::Number),
    /// Arrays, objects, booleans and null.
    Json(serde_json::Value),
}

/// Storage tag for a [`SettingValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Text,
    Number,
    Json,
}

impl SettingKind {
    /// Returns the string representation for database storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Json => "json",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "number" => Some(Self::Number),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SettingValue {
    #[must_use]
    pub fn kind(&self) -> SettingKind {
        match self {
            Self::Text(_) => SettingKind::Text,
            Self::Number(_) => SettingKind::Number,
            Self::Json(_) => SettingKind::Json,
        }
    }

    /// The value as plain JSON, as sent to API clients.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Number(n) => serde_json::Value::Number(n.clone()),
            Self::Json(v) => v.clone(),
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    fn encode(&self) -> Result<String, StoreError> {
        Ok(match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Json(v) => serde_json::to_string(v)?,
        })
    }

    /// Read a stored value back.
    ///
    /// Rows written by the worker carry no kind; built-in keys then use their
    /// default kind and anything else is text.
    fn decode(key: &str, kind: Option<&str>, raw: Option<String>) -> Result<Self, StoreError> {
        let kind = kind.or_else(|| default_kind(key)).unwrap_or("text");
        let raw = raw.unwrap_or_default();
        let corrupt = || StoreError::CorruptSetting {
            key: key.to_string(),
            kind: kind.to_string(),
        };
        match SettingKind::parse(kind).ok_or_else(corrupt)? {
            SettingKind::Text => Ok(Self::Text(raw)),
            SettingKind::Number => serde_json::from_str(&raw)
                .map(Self::Number)
                .map_err(|_| corrupt()),
            SettingKind::Json => serde_json::from_str(&raw)
                .map(Self::Json)
                .map_err(|_| corrupt()),
        }
    }
}

impl From<serde_json::Value> for SettingValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Number(n) => Self::Number(n),
            other => Self::Json(other),
        }
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl Serialize for SettingValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SettingValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}

impl Store {
    /// Every setting, keyed by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored value is corrupt.
    pub async fn get_all_settings(&self) -> Result<BTreeMap<String, SettingValue>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT setting_key, setting_kind, setting_value FROM admin_settings
                 WHERE setting_key IS NOT NULL ORDER BY setting_key",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(key, kind, raw)| {
                    let value = SettingValue::decode(&key, kind.as_deref(), raw)?;
                    Ok((key, value))
                })
                .collect()
        })
        .await
    }

    /// A single setting.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored value is corrupt.
    pub async fn get_setting(&self, key: &str) -> Result<Option<SettingValue>, StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT setting_kind, setting_value FROM admin_settings WHERE setting_key = ?1",
                    params![key],
                    |row| {
                        Ok((
                            row.get::<_, Option<String>>(0)?,
                            row.get::<_, Option<String>>(1)?,
                        ))
                    },
                )
                .optional()?;
            row.map(|(kind, raw)| SettingValue::decode(&key, kind.as_deref(), raw))
                .transpose()
        })
        .await
    }

    /// Insert or replace one setting.
    ///
    /// JSON values are stored as JSON text, which is what the worker parses.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be encoded or written.
    pub async fn upsert_setting(
        &self,
        key: &str,
        value: &SettingValue,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let key = key.to_string();
        let kind = value.kind().as_str();
        let encoded = value.encode()?;
        let updated_at = updated_at.format("%Y-%m-%d %H:%M:%S%.6f").to_string();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO admin_settings (setting_key, setting_kind, setting_value, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(setting_key) DO UPDATE SET
                     setting_kind = excluded.setting_kind,
                     setting_value = excluded.setting_value,
                     updated_at = excluded.updated_at",
                params![key, kind, encoded, updated_at],
            )?;
            Ok(())
        })
        .await
    }

    /// Upsert several settings, one statement per key.
    ///
    /// Not atomic across keys: if a write fails, earlier keys stay written.
    /// Returns the number of keys written.
    ///
    /// # Errors
    ///
    /// Returns the first write error encountered.
    pub async fn upsert_settings(
        &self,
        settings: &BTreeMap<String, SettingValue>,
    ) -> Result<usize, StoreError> {
        let now = Utc::now();
        for (key, value) in settings {
            self.upsert_setting(key, value, now).await?;
            tracing::debug!(key = %key, kind = %value.kind(), "Setting updated");
        }
        Ok(settings.len())
    }
}
