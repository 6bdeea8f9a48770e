use crate::field::Field;
use crate::invariants::debug_assert_field_count_bounded;
use crate::level::Level;
use std::fmt;
use std::mem::MaybeUninit;
use std::ptr;

/// Maximum number of fields a single record can carry.
pub const MAX_FIELDS: usize = 32;

/// A fixed-capacity, poolable log event.
///
/// `Record` owns everything a call-site attaches to one log event: level,
/// logger name, message, optional caller/stack strings, and up to
/// [`MAX_FIELDS`] fields in an inline array. There is no heap allocation
/// for the field array itself — only individual field payloads (strings,
/// byte slices) may allocate, exactly as a plain `String`/`Vec<u8>` would.
///
/// A record in flight between producer publish and consumer consume is
/// owned exclusively by its ring slot; neither side may mutate it outside
/// that protocol.
pub struct Record {
    pub level: Level,
    pub logger: String,
    pub message: String,
    pub caller: Option<String>,
    pub stack: Option<String>,
    fields: [MaybeUninit<Field>; MAX_FIELDS],
    field_count: u32,
}

// Safety: Record's heap payloads (String/Vec/Arc<dyn FormatObject + Send + Sync>)
// are all Send; the fixed field array holds no interior mutability.
unsafe impl Send for Record {}

impl Record {
    /// An empty record, suitable as pool storage before first use.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            level: Level::Info,
            logger: String::new(),
            message: String::new(),
            caller: None,
            stack: None,
            fields: unsafe { MaybeUninit::uninit().assume_init() },
            field_count: 0,
        }
    }

    /// Initializes a fresh record for a call-site; equivalent to
    /// `reset()` followed by setting level and message.
    #[must_use]
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        let mut record = Self::empty();
        record.level = level;
        record.message = message.into();
        record
    }

    /// Appends a field. Returns `false` (record unchanged) once
    /// [`MAX_FIELDS`] fields are already present.
    pub fn add_field(&mut self, field: Field) -> bool {
        if self.field_count as usize >= MAX_FIELDS {
            return false;
        }
        let idx = self.field_count as usize;
        self.fields[idx] = MaybeUninit::new(field);
        self.field_count += 1;
        debug_assert_field_count_bounded!(self.field_count as usize, MAX_FIELDS);
        true
    }

    #[inline]
    #[must_use]
    pub fn field_count(&self) -> i32 {
        self.field_count as i32
    }

    /// Returns field `i`, or a zero-valued field for any out-of-bounds
    /// index — this operation never errors.
    #[must_use]
    pub fn field(&self, i: usize) -> &Field {
        static ZERO: Field = Field {
            key: String::new(),
            value: crate::field::FieldValue::Bool(false),
        };
        if i < self.field_count as usize {
            unsafe { self.fields[i].assume_init_ref() }
        } else {
            &ZERO
        }
    }

    /// All live fields, in publish order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        let initialized = unsafe {
            std::slice::from_raw_parts(
                self.fields.as_ptr().cast::<Field>(),
                self.field_count as usize,
            )
        };
        initialized
    }

    /// Clears message, caller, stack, and every field, dropping any heap
    /// payloads so the record can return to the pool leak-free.
    pub fn reset(&mut self) {
        self.level = Level::Info;
        self.logger.clear();
        self.message.clear();
        self.caller = None;
        self.stack = None;
        for i in 0..self.field_count as usize {
            unsafe {
                ptr::drop_in_place(self.fields[i].as_mut_ptr());
            }
        }
        self.field_count = 0;
    }
}

impl Drop for Record {
    fn drop(&mut self) {
        for i in 0..self.field_count as usize {
            unsafe {
                ptr::drop_in_place(self.fields[i].as_mut_ptr());
            }
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("level", &self.level)
            .field("logger", &self.logger)
            .field("message", &self.message)
            .field("caller", &self.caller)
            .field("stack", &self.stack)
            .field("fields", &self.fields())
            .finish()
    }
}
