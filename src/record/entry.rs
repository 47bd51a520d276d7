//! Record Entry Module
//!
//! Defines the self-describing record stored in a hash table field.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{CacheError, Result};
use crate::record::{timespan, BoxedValue, RecordValue};

// == Record ==
/// A typed value stored under `key` in a hash table.
///
/// Records are only built by the factories below, which stamp the set date,
/// the expiry date and the type tag. `is_expired` is derived on every call and
/// never persisted.
#[derive(Debug, Clone)]
pub struct Record {
    key: String,
    value: Option<BoxedValue>,
    type_name: String,
    set_date: DateTime<Utc>,
    expiry_date: Option<DateTime<Utc>>,
    lifetime: Option<Duration>,
}

impl Record {
    // == Constructor ==
    /// Creates a record stamped with the current time.
    ///
    /// # Arguments
    /// * `key` - Field key inside the hash table, must not be blank
    /// * `value` - Payload; its [`RecordValue::type_name`] becomes the type tag
    /// * `lifetime` - Optional per-record lifetime, independent of the table TTL
    pub fn new<V: RecordValue>(
        key: impl Into<String>,
        value: V,
        lifetime: Option<Duration>,
    ) -> Result<Self> {
        Self::new_at(key, value, lifetime, Utc::now())
    }

    /// Creates a record stamped with `now` instead of the wall clock.
    ///
    /// The lifetime is rounded down to 100ns ticks so that the expiry date
    /// and the lifetime both survive the wire format unchanged.
    pub fn new_at<V: RecordValue>(
        key: impl Into<String>,
        value: V,
        lifetime: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(CacheError::Validation(
                "Record key cannot be empty".to_string(),
            ));
        }

        let lifetime = lifetime.map(timespan::truncate_to_ticks);
        let expiry_date = lifetime.map(|lifetime| expiry_after(now, lifetime)).transpose()?;

        Ok(Self {
            key,
            value: Some(BoxedValue::new(value)),
            type_name: V::type_name().into_owned(),
            set_date: now,
            expiry_date,
            lifetime,
        })
    }

    /// Reassembles a decoded record. Field validation is the codec's job.
    pub(crate) fn from_parts(
        key: String,
        value: Option<BoxedValue>,
        type_name: String,
        set_date: DateTime<Utc>,
        expiry_date: Option<DateTime<Utc>>,
        lifetime: Option<Duration>,
    ) -> Self {
        Self {
            key,
            value,
            type_name,
            set_date,
            expiry_date,
            lifetime,
        }
    }

    // == Accessors ==
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The payload, or `None` if the stored type tag was not known to the
    /// decoding registry.
    pub fn value(&self) -> Option<&BoxedValue> {
        self.value.as_ref()
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn set_date(&self) -> DateTime<Utc> {
        self.set_date
    }

    pub fn expiry_date(&self) -> Option<DateTime<Utc>> {
        self.expiry_date
    }

    pub fn lifetime(&self) -> Option<Duration> {
        self.lifetime
    }

    // == Unwrap ==
    /// Borrows the payload as `T` when present and of that type.
    pub fn value_as<T: RecordValue>(&self) -> Option<&T> {
        self.value.as_ref().and_then(BoxedValue::downcast_ref::<T>)
    }

    /// Consumes the record, returning the payload as `T` when present and of
    /// that type.
    pub fn into_value<T: RecordValue>(self) -> Option<T> {
        self.value.and_then(BoxedValue::downcast::<T>)
    }

    // == Is Expired ==
    /// Checks whether the record's own lifetime has elapsed.
    ///
    /// A record without an expiry date never expires; otherwise it expires
    /// once the expiry date is strictly in the past.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Same as [`Record::is_expired`], evaluated at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expiry_date, Some(expiry) if expiry < now)
    }
}

fn expiry_after(now: DateTime<Utc>, lifetime: Duration) -> Result<DateTime<Utc>> {
    chrono::Duration::from_std(lifetime)
        .ok()
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| {
            CacheError::Validation(format!("Record lifetime {:?} is out of range", lifetime))
        })
}
