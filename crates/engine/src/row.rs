//! Rows: typed field values of one object or record
//!
//! A `Row` is bound to a structure type of the application. Writes are
//! checked against the field declarations as they happen, but a failed
//! write does not panic or return: the error is kept on the row and
//! reported by [`Row::build`]. This lets callers fill a row from external
//! data in one pass and get every problem at once.
//!
//! System fields (`sys.ID`, `sys.ParentID`, `sys.Container`,
//! `sys.IsActive`) are stored apart from user values. An empty string or
//! byte string written to a field clears it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use base64::Engine as _;

use appstruct_appdef::{
    AppDef, Constraint, ConstraintKind, ConstraintValue, DataKind, Field, Structure, TypeKind,
    SYS_FIELD_CONTAINER, SYS_FIELD_ID, SYS_FIELD_IS_ACTIVE, SYS_FIELD_PARENT_ID, SYS_FIELD_QNAME,
};
use appstruct_core::{QName, RecordID, NULL_QNAME, NULL_RECORD_ID};

use crate::error::{Error, ErrorKind, Errors, Result};
use crate::value::Value;

/// Raw ID to storage ID assignments of one event
pub type IdPlan = HashMap<RecordID, RecordID>;

/// Field values of an object or record
#[derive(Debug, Clone)]
pub struct Row {
    app: Arc<AppDef>,
    qname: QName,
    id: RecordID,
    parent: RecordID,
    container: String,
    is_active: bool,
    is_new: bool,
    values: BTreeMap<String, Value>,
    nils: BTreeSet<String>,
    errs: Vec<Error>,
}

impl Row {
    /// Create a row without type
    pub fn new(app: Arc<AppDef>) -> Self {
        Row {
            app,
            qname: NULL_QNAME,
            id: NULL_RECORD_ID,
            parent: NULL_RECORD_ID,
            container: String::new(),
            is_active: false,
            is_new: false,
            values: BTreeMap::new(),
            nils: BTreeSet::new(),
            errs: Vec::new(),
        }
    }

    /// Create a row of the given type
    pub fn with_qname(app: Arc<AppDef>, qname: QName) -> Self {
        let mut row = Row::new(app);
        row.set_qname(qname);
        row
    }

    /// Bind the row to a type. Values and system fields are reset; errors
    /// collected so far are kept.
    pub(crate) fn set_qname(&mut self, qname: QName) {
        self.values.clear();
        self.nils.clear();
        self.id = NULL_RECORD_ID;
        self.parent = NULL_RECORD_ID;
        self.container.clear();
        self.is_active = false;
        self.qname = qname;
        if self.qname.is_null() {
            return;
        }
        match self.app.structure(&self.qname) {
            Some(s) => self.is_active = s.kind().has_is_active(),
            None => self.collect(Error::new(
                ErrorKind::NameNotFound,
                format!("structure type «{}» not found", self.qname),
            )),
        }
    }

    pub(crate) fn set_id(&mut self, id: RecordID) {
        self.id = id;
    }

    pub(crate) fn set_parent(&mut self, id: RecordID) {
        self.parent = id;
    }

    pub(crate) fn set_container(&mut self, name: impl Into<String>) {
        self.container = name.into();
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    pub(crate) fn set_new(&mut self, is_new: bool) {
        self.is_new = is_new;
    }

    pub(crate) fn collect(&mut self, e: Error) {
        self.errs.push(e);
    }

    /// Store a decoded value without checks
    pub(crate) fn set_raw_value(&mut self, name: String, value: Value) {
        self.nils.remove(&name);
        self.values.insert(name, value);
    }

    /// Drop a user value without checks
    pub(crate) fn remove_value(&mut self, name: &str) {
        self.values.remove(name);
        self.nils.remove(name);
    }

    /// Store a decoded nil without checks
    pub(crate) fn set_raw_nil(&mut self, name: String) {
        self.values.remove(&name);
        self.nils.insert(name);
    }

    /// Application definition the row is bound to
    pub fn app_def(&self) -> &Arc<AppDef> {
        &self.app
    }

    /// Type name; null for untyped rows
    pub fn qname(&self) -> &QName {
        &self.qname
    }

    /// Structure type, if the row is typed
    pub fn structure(&self) -> Option<&Structure> {
        self.app.structure(&self.qname)
    }

    /// Kind of the row type
    pub fn kind(&self) -> TypeKind {
        self.app.type_kind(&self.qname)
    }

    /// Record ID (`sys.ID`)
    pub fn id(&self) -> RecordID {
        self.id
    }

    /// Parent record ID (`sys.ParentID`)
    pub fn parent(&self) -> RecordID {
        self.parent
    }

    /// Container name in the parent (`sys.Container`)
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Active flag (`sys.IsActive`)
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns true for rows created by the event, false for updates
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Returns true if the row has no type
    pub fn is_empty(&self) -> bool {
        self.qname.is_null()
    }

    fn has_sys_field(&self, name: &str) -> bool {
        self.structure().is_some_and(|s| s.field(name).is_some())
    }

    fn user_field(&self, name: &str) -> Result<&Field> {
        let s = self.structure().ok_or_else(|| {
            Error::new(
                ErrorKind::NameNotFound,
                format!("can not put field «{}» into untyped row «{}»", name, self.qname),
            )
        })?;
        s.field(name).ok_or_else(|| {
            Error::new(
                ErrorKind::NameNotFound,
                format!("field «{}» not found in {}", name, s),
            )
        })
    }

    fn wrong_type(&self, name: &str, what: impl fmt::Display) -> Error {
        Error::new(
            ErrorKind::WrongFieldType,
            format!("{} can not be put into field «{}» of {}", what, name, self),
        )
    }

    fn try_put(&mut self, name: &str, value: Value) -> Result<()> {
        let is_sys = matches!(
            name,
            SYS_FIELD_QNAME | SYS_FIELD_ID | SYS_FIELD_PARENT_ID | SYS_FIELD_CONTAINER | SYS_FIELD_IS_ACTIVE
        );
        if is_sys {
            if !self.has_sys_field(name) {
                return Err(Error::new(
                    ErrorKind::NameNotFound,
                    format!("system field «{}» not found in {}", name, self),
                ));
            }
            return match (name, value) {
                (SYS_FIELD_QNAME, Value::QName(q)) if q == self.qname => Ok(()),
                (SYS_FIELD_QNAME, _) => Err(Error::new(
                    ErrorKind::UnableToUpdateSystemField,
                    format!("type of {} can not be changed", self),
                )),
                (SYS_FIELD_ID, Value::RecordID(id)) => {
                    self.id = id;
                    Ok(())
                }
                (SYS_FIELD_PARENT_ID, Value::RecordID(id)) => {
                    self.parent = id;
                    Ok(())
                }
                (SYS_FIELD_CONTAINER, Value::String(c)) => {
                    self.container = c;
                    Ok(())
                }
                (SYS_FIELD_IS_ACTIVE, Value::Bool(b)) => {
                    self.is_active = b;
                    Ok(())
                }
                (_, v) => Err(self.wrong_type(name, format!("{} value", v.data_kind()))),
            };
        }

        let kind = self.user_field(name)?.data_kind();
        if kind != value.data_kind() {
            return Err(self.wrong_type(name, format!("{} value", value.data_kind())));
        }
        if value.is_empty() {
            self.values.remove(name);
            self.nils.insert(name.to_string());
        } else {
            self.nils.remove(name);
            self.values.insert(name.to_string(), value);
        }
        Ok(())
    }

    /// Write a value; a failure is kept and reported by `build()`
    pub fn put(&mut self, name: &str, value: Value) {
        if let Err(e) = self.try_put(name, value) {
            self.collect(e);
        }
    }

    /// Write an int32 field
    pub fn put_int32(&mut self, name: &str, value: i32) {
        self.put(name, Value::Int32(value));
    }

    /// Write an int64 field
    pub fn put_int64(&mut self, name: &str, value: i64) {
        self.put(name, Value::Int64(value));
    }

    /// Write a float32 field
    pub fn put_float32(&mut self, name: &str, value: f32) {
        self.put(name, Value::Float32(value));
    }

    /// Write a float64 field
    pub fn put_float64(&mut self, name: &str, value: f64) {
        self.put(name, Value::Float64(value));
    }

    /// Write a bytes field
    pub fn put_bytes(&mut self, name: &str, value: &[u8]) {
        self.put(name, Value::Bytes(value.to_vec()));
    }

    /// Write a string field
    pub fn put_string(&mut self, name: &str, value: &str) {
        self.put(name, Value::String(value.to_string()));
    }

    /// Write a QName field
    pub fn put_qname(&mut self, name: &str, value: QName) {
        self.put(name, Value::QName(value));
    }

    /// Write a bool field
    pub fn put_bool(&mut self, name: &str, value: bool) {
        self.put(name, Value::Bool(value));
    }

    /// Write a record reference field, `sys.ID` or `sys.ParentID`
    pub fn put_record_id(&mut self, name: &str, value: RecordID) {
        self.put(name, Value::RecordID(value));
    }

    fn target_kind(&self, name: &str) -> Result<DataKind> {
        match name {
            SYS_FIELD_ID | SYS_FIELD_PARENT_ID => Ok(DataKind::RecordID),
            SYS_FIELD_CONTAINER => Ok(DataKind::String),
            SYS_FIELD_QNAME => Ok(DataKind::QName),
            SYS_FIELD_IS_ACTIVE => Ok(DataKind::Bool),
            _ => Ok(self.user_field(name)?.data_kind()),
        }
    }

    /// Write a number into a numeric or record ID field, converting it to
    /// the field kind. Fractions and values out of the kind's range are
    /// rejected.
    pub fn put_number(&mut self, name: &str, value: f64) {
        let v = match self.target_kind(name) {
            Ok(DataKind::Int32) if is_integral(value, i32::MIN as f64, -(i32::MIN as f64)) => {
                Value::Int32(value as i32)
            }
            Ok(DataKind::Int64) if is_integral(value, i64::MIN as f64, -(i64::MIN as f64)) => {
                Value::Int64(value as i64)
            }
            Ok(DataKind::Float32) if !value.is_finite() || (value as f32).is_finite() => {
                Value::Float32(value as f32)
            }
            Ok(DataKind::Float64) => Value::Float64(value),
            Ok(DataKind::RecordID) if is_integral(value, 0.0, 2.0 * -(i64::MIN as f64)) => {
                Value::RecordID(RecordID(value as u64))
            }
            Ok(_) => {
                let e = self.wrong_type(name, format!("number {}", value));
                return self.collect(e);
            }
            Err(e) => return self.collect(e),
        };
        self.put(name, v);
    }

    /// Write text into a string, bytes (base64) or QName field
    pub fn put_chars(&mut self, name: &str, value: &str) {
        let v = match self.target_kind(name) {
            Ok(DataKind::String) => Value::String(value.to_string()),
            Ok(DataKind::Bytes) => match base64::engine::general_purpose::STANDARD.decode(value) {
                Ok(b) => Value::Bytes(b),
                Err(err) => {
                    let e = self.wrong_type(name, format!("invalid base64 «{}» ({})", value, err));
                    return self.collect(e);
                }
            },
            Ok(DataKind::QName) => match value.parse::<QName>() {
                Ok(q) => Value::QName(q),
                Err(err) => {
                    let e = self.wrong_type(name, format!("«{}» ({})", value, err));
                    return self.collect(e);
                }
            },
            Ok(_) => {
                let e = self.wrong_type(name, format!("chars «{}»", value));
                return self.collect(e);
            }
            Err(e) => return self.collect(e),
        };
        self.put(name, v);
    }

    /// Value of a user field, `None` if absent
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// User values in name order
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Fields cleared by writing an empty value
    pub fn nils(&self) -> impl Iterator<Item = &str> {
        self.nils.iter().map(String::as_str)
    }

    /// Returns true if a value is set for the user field
    pub fn has_value(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Int32 value, zero if absent
    pub fn as_int32(&self, name: &str) -> i32 {
        match self.values.get(name) {
            Some(Value::Int32(v)) => *v,
            _ => 0,
        }
    }

    /// Int64 value, zero if absent
    pub fn as_int64(&self, name: &str) -> i64 {
        match self.values.get(name) {
            Some(Value::Int64(v)) => *v,
            _ => 0,
        }
    }

    /// Float32 value, zero if absent
    pub fn as_float32(&self, name: &str) -> f32 {
        match self.values.get(name) {
            Some(Value::Float32(v)) => *v,
            _ => 0.0,
        }
    }

    /// Float64 value, zero if absent
    pub fn as_float64(&self, name: &str) -> f64 {
        match self.values.get(name) {
            Some(Value::Float64(v)) => *v,
            _ => 0.0,
        }
    }

    /// Bytes value, empty if absent
    pub fn as_bytes(&self, name: &str) -> &[u8] {
        match self.values.get(name) {
            Some(Value::Bytes(v)) => v,
            _ => &[],
        }
    }

    /// String value or `sys.Container`, empty if absent
    pub fn as_string(&self, name: &str) -> &str {
        if name == SYS_FIELD_CONTAINER {
            return &self.container;
        }
        match self.values.get(name) {
            Some(Value::String(v)) => v,
            _ => "",
        }
    }

    /// QName value or `sys.QName`, null if absent
    pub fn as_qname(&self, name: &str) -> QName {
        if name == SYS_FIELD_QNAME {
            return self.qname.clone();
        }
        match self.values.get(name) {
            Some(Value::QName(v)) => v.clone(),
            _ => NULL_QNAME,
        }
    }

    /// Bool value or `sys.IsActive`, false if absent
    pub fn as_bool(&self, name: &str) -> bool {
        if name == SYS_FIELD_IS_ACTIVE {
            return self.is_active;
        }
        matches!(self.values.get(name), Some(Value::Bool(true)))
    }

    /// Record ID value, `sys.ID` or `sys.ParentID`, null if absent
    pub fn as_record_id(&self, name: &str) -> RecordID {
        match name {
            SYS_FIELD_ID => self.id,
            SYS_FIELD_PARENT_ID => self.parent,
            _ => match self.values.get(name) {
                Some(Value::RecordID(v)) => *v,
                _ => NULL_RECORD_ID,
            },
        }
    }

    /// Names of the fields that have values, system fields included, in
    /// declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.structure()
            .into_iter()
            .flat_map(|s| s.fields().iter())
            .filter(move |f| f.is_sys() || self.values.contains_key(f.name()))
            .map(Field::name)
    }

    /// Record ID fields: `sys.ParentID` and user reference fields.
    /// `sys.ID` is not included.
    pub fn record_ids(&self, include_nulls: bool) -> Vec<(String, RecordID)> {
        let mut ids = Vec::new();
        let Some(s) = self.structure() else {
            return ids;
        };
        if s.field(SYS_FIELD_PARENT_ID).is_some() && (include_nulls || !self.parent.is_null()) {
            ids.push((SYS_FIELD_PARENT_ID.to_string(), self.parent));
        }
        for f in s.fields().user_fields() {
            if f.data_kind() != DataKind::RecordID {
                continue;
            }
            let id = self.as_record_id(f.name());
            if include_nulls || !id.is_null() {
                ids.push((f.name().to_string(), id));
            }
        }
        ids
    }

    /// Replace raw IDs in reference fields using the plan. Raw IDs missing
    /// from the plan are errors when `strict`, kept otherwise.
    /// Returns true if something changed.
    pub(crate) fn rewrite_ids(&mut self, plan: &IdPlan, strict: bool) -> Result<bool> {
        let mut changed = false;
        for (name, id) in self.record_ids(false) {
            if !id.is_raw() {
                continue;
            }
            match plan.get(&id) {
                Some(new_id) => {
                    self.put_record_id(&name, *new_id);
                    changed = true;
                }
                None if strict => {
                    return Err(Error::new(
                        ErrorKind::RecordIDNotFound,
                        format!("{} field «{}» refers to unknown raw ID «{}»", self, name, id),
                    ))
                }
                None => {}
            }
        }
        Ok(changed)
    }

    /// Check collected write errors and data constraints
    ///
    /// # Errors
    ///
    /// Returns every write error and constraint violation.
    pub fn build(&self) -> Result<()> {
        let mut errs = Errors::default();
        for e in &self.errs {
            errs.push(e.clone());
        }
        if let Some(s) = self.structure() {
            for (name, value) in &self.values {
                if let Some(f) = s.field(name) {
                    for c in f.constraints().values() {
                        if !satisfies(c, value) {
                            errs.add(
                                ErrorKind::DataConstraintViolation,
                                format!(
                                    "{} {} value {} violates constraint «{}»",
                                    s, f, value, c
                                ),
                            );
                        }
                    }
                }
            }
        }
        errs.into_result()
    }

    /// Check that every required user field has a value
    ///
    /// # Errors
    ///
    /// Returns one `FieldIsEmpty` error per missing field.
    pub fn validate_required(&self) -> Result<()> {
        let mut errs = Errors::default();
        if let Some(s) = self.structure() {
            for f in s.fields().user_fields().filter(|f| f.required()) {
                let empty = match self.values.get(f.name()) {
                    None => true,
                    Some(Value::RecordID(id)) => id.is_null(),
                    Some(_) => false,
                };
                if empty {
                    errs.add(
                        ErrorKind::FieldIsEmpty,
                        format!("{} required {} is empty", s, f),
                    );
                }
            }
        }
        errs.into_result()
    }
}

/// Returns true if the value satisfies the constraint
fn satisfies(c: &Constraint, value: &Value) -> bool {
    match c.value() {
        ConstraintValue::Len(n) => {
            let len = match value {
                Value::String(s) => s.len(),
                Value::Bytes(b) => b.len(),
                _ => return true,
            };
            match c.kind() {
                ConstraintKind::MinLen => len >= usize::from(*n),
                _ => len <= usize::from(*n),
            }
        }
        ConstraintValue::Pattern(re) => match value {
            Value::String(s) => re.is_match(s),
            Value::Bytes(b) => re.is_match(&String::from_utf8_lossy(b)),
            _ => true,
        },
        ConstraintValue::Number(bound) => {
            let Some(v) = value.as_f64() else {
                return true;
            };
            match c.kind() {
                ConstraintKind::MinIncl => v >= *bound,
                ConstraintKind::MinExcl => v > *bound,
                ConstraintKind::MaxIncl => v <= *bound,
                ConstraintKind::MaxExcl => v < *bound,
                _ => true,
            }
        }
        ConstraintValue::Enum(values) => match value {
            Value::Int32(v) => values.contains_int32(*v),
            Value::Int64(v) => values.contains_int64(*v),
            Value::Float32(v) => values.contains_float32(*v),
            Value::Float64(v) => values.contains_float64(*v),
            Value::String(v) => values.contains_str(v),
            _ => true,
        },
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.qname == other.qname
            && self.id == other.id
            && self.parent == other.parent
            && self.container == other.container
            && self.is_active == other.is_active
            && self.values == other.values
            && self.nils == other.nils
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.structure() {
            Some(s) => s.fmt(f),
            None => write!(f, "row «{}»", self.qname),
        }
    }
}

/// `value` is a whole number in `[min, end)`
fn is_integral(value: f64, min: f64, end: f64) -> bool {
    value.fract() == 0.0 && value >= min && value < end
}
