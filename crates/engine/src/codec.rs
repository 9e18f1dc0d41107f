//! Binary event and record codec
//!
//! Every encoded blob starts with a codec version byte:
//!
//! | Version | Names, containers and fields written as |
//! |---------|-----------------------------------------|
//! | 0       | strings                                 |
//! | 1       | compact IDs from the prepared tables    |
//!
//! Encoding always uses the latest version, decoding accepts any known
//! one. Integers are big-endian, strings and byte strings carry a `u32`
//! length prefix.
//!
//! Event layout after the version byte:
//!
//! ```text
//! partition u16 | plog offset u64 | workspace u64 | wlog offset u64
//! name | registered at i64 | sync u8 [device u16 | synced at i64]
//! valid u8
//!   valid:   argument tree | creates u16 + rows | updates u16 + change rows
//!   invalid: error text | requested name text | request bytes
//! ```
//!
//! The unlogged argument is never written.

use std::io::{Cursor, Read};
use std::sync::Arc;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use appstruct_appdef::{DataKind, Field, Structure};
use appstruct_core::{QName, RecordID, NULL_QNAME};

use crate::config::PreparedApp;
use crate::error::{Error, ErrorKind, Result};
use crate::event::{Event, EventError, EventState};
use crate::object::Object;
use crate::row::Row;
use crate::value::Value;

/// Names written as strings
pub const CODEC_RAW: u8 = 0;
/// Names written as compact IDs
pub const CODEC_COMPACT: u8 = 1;
/// Version used for encoding
pub const CODEC_LAST: u8 = CODEC_COMPACT;

fn write_err(e: std::io::Error) -> Error {
    Error::new(ErrorKind::Storage, format!("write event bytes: {}", e))
}

fn read_err(e: std::io::Error) -> Error {
    Error::decode(format!("truncated bytes: {}", e))
}

fn check_codec(codec: u8) -> Result<()> {
    if codec > CODEC_LAST {
        return Err(Error::new(
            ErrorKind::UnknownCodec,
            format!("unknown codec version «{}»", codec),
        ));
    }
    Ok(())
}

fn qname_text(q: &QName) -> String {
    if q.is_null() {
        String::new()
    } else {
        q.to_string()
    }
}

fn parse_qname(s: &str) -> Result<QName> {
    if s.is_empty() {
        return Ok(NULL_QNAME);
    }
    s.parse()
        .map_err(|e| Error::decode(format!("stored name «{}»: {}", s, e)))
}

struct Writer<'a> {
    codec: u8,
    app: &'a PreparedApp,
    buf: &'a mut Vec<u8>,
}

impl Writer<'_> {
    fn u8(&mut self, v: u8) -> Result<()> {
        self.buf.write_u8(v).map_err(write_err)
    }

    fn u16(&mut self, v: u16) -> Result<()> {
        self.buf.write_u16::<BigEndian>(v).map_err(write_err)
    }

    fn u32(&mut self, v: u32) -> Result<()> {
        self.buf.write_u32::<BigEndian>(v).map_err(write_err)
    }

    fn u64(&mut self, v: u64) -> Result<()> {
        self.buf.write_u64::<BigEndian>(v).map_err(write_err)
    }

    fn i64(&mut self, v: i64) -> Result<()> {
        self.buf.write_i64::<BigEndian>(v).map_err(write_err)
    }

    fn count(&mut self, n: usize) -> Result<()> {
        let n = u16::try_from(n)
            .map_err(|_| Error::new(ErrorKind::Storage, format!("too many items to encode: {}", n)))?;
        self.u16(n)
    }

    fn bytes(&mut self, b: &[u8]) -> Result<()> {
        let n = u32::try_from(b.len())
            .map_err(|_| Error::new(ErrorKind::Storage, format!("value too long: {} bytes", b.len())))?;
        self.u32(n)?;
        self.buf.extend_from_slice(b);
        Ok(())
    }

    fn string(&mut self, s: &str) -> Result<()> {
        self.bytes(s.as_bytes())
    }

    fn qname(&mut self, q: &QName) -> Result<()> {
        match self.codec {
            CODEC_RAW => self.string(&qname_text(q)),
            _ => {
                let id = self.app.qnames().id(q)?;
                self.u16(id)
            }
        }
    }

    fn container(&mut self, name: &str) -> Result<()> {
        match self.codec {
            CODEC_RAW => self.string(name),
            _ => {
                let id = self.app.containers().id(name)?;
                self.u16(id)
            }
        }
    }

    fn field(&mut self, s: &Structure, name: &str) -> Result<()> {
        match self.codec {
            CODEC_RAW => self.string(name),
            _ => {
                let idx = s.fields().index_of(name).ok_or_else(|| {
                    Error::new(ErrorKind::NameNotFound, format!("field «{}» not found in {}", name, s))
                })?;
                self.count(idx)
            }
        }
    }

    fn value(&mut self, v: &Value) -> Result<()> {
        self.u8(v.data_kind().code())?;
        match v {
            Value::Int32(x) => self.buf.write_i32::<BigEndian>(*x).map_err(write_err),
            Value::Int64(x) => self.i64(*x),
            Value::Float32(x) => self.buf.write_f32::<BigEndian>(*x).map_err(write_err),
            Value::Float64(x) => self.buf.write_f64::<BigEndian>(*x).map_err(write_err),
            Value::Bytes(b) => self.bytes(b),
            Value::String(s) => self.string(s),
            Value::QName(q) => self.string(&qname_text(q)),
            Value::Bool(b) => self.u8(u8::from(*b)),
            Value::RecordID(id) => self.u64(id.0),
        }
    }

    fn row(&mut self, row: &Row) -> Result<()> {
        self.qname(row.qname())?;
        if row.qname().is_null() {
            return Ok(());
        }
        let s = row.structure().ok_or_else(|| {
            Error::new(ErrorKind::NameNotFound, format!("unknown row type «{}»", row.qname()))
        })?;
        self.u64(row.id().0)?;
        self.u64(row.parent().0)?;
        self.container(row.container())?;
        self.u8(u8::from(row.is_active()))?;

        let values: Vec<(&str, &Value)> = row.values().collect();
        self.count(values.len())?;
        for (name, v) in values {
            self.field(s, name)?;
            self.value(v)?;
        }
        let nils: Vec<&str> = row.nils().collect();
        self.count(nils.len())?;
        for name in nils {
            self.field(s, name)?;
        }
        Ok(())
    }

    fn object(&mut self, o: &Object) -> Result<()> {
        self.row(o.row())?;
        let children: Vec<&Object> = o.children("").collect();
        self.count(children.len())?;
        for c in children {
            self.object(c)?;
        }
        Ok(())
    }

    fn event(&mut self, ev: &Event) -> Result<()> {
        self.u8(self.codec)?;
        self.u16(ev.partition())?;
        self.u64(ev.plog_offset())?;
        self.u64(ev.workspace())?;
        self.u64(ev.wlog_offset())?;
        self.qname(&ev.qname())?;
        self.i64(ev.registered_at())?;
        self.u8(u8::from(ev.synced()))?;
        if ev.synced() {
            self.u16(ev.device())?;
            self.i64(ev.synced_at())?;
        }

        let err = ev.error();
        self.u8(u8::from(err.valid()))?;
        if !err.valid() {
            self.string(err.message())?;
            self.string(&qname_text(err.qname_from_params()))?;
            return self.bytes(err.bytes());
        }

        self.object(ev.arg_object())?;
        let cud = ev.cud();
        self.count(cud.creates().len())?;
        for rec in cud.creates() {
            self.row(rec)?;
        }
        let updates: Vec<_> = cud.updates().collect();
        self.count(updates.len())?;
        for u in updates {
            self.row(u.changes())?;
        }
        Ok(())
    }
}

struct Reader<'a> {
    codec: u8,
    app: &'a PreparedApp,
    cur: Cursor<&'a [u8]>,
}

impl<'a> Reader<'a> {
    fn new(app: &'a PreparedApp, bytes: &'a [u8]) -> Result<Self> {
        let mut cur = Cursor::new(bytes);
        let codec = cur
            .read_u8()
            .map_err(|_| Error::decode("empty bytes, codec version expected"))?;
        check_codec(codec)?;
        Ok(Reader { codec, app, cur })
    }

    fn remaining(&self) -> usize {
        let len = self.cur.get_ref().len();
        len.saturating_sub(self.cur.position() as usize)
    }

    fn finish(&self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(Error::decode(format!("{} trailing bytes", n))),
        }
    }

    fn u8(&mut self) -> Result<u8> {
        self.cur.read_u8().map_err(read_err)
    }

    fn u16(&mut self) -> Result<u16> {
        self.cur.read_u16::<BigEndian>().map_err(read_err)
    }

    fn u32(&mut self) -> Result<u32> {
        self.cur.read_u32::<BigEndian>().map_err(read_err)
    }

    fn u64(&mut self) -> Result<u64> {
        self.cur.read_u64::<BigEndian>().map_err(read_err)
    }

    fn i64(&mut self) -> Result<i64> {
        self.cur.read_i64::<BigEndian>().map_err(read_err)
    }

    fn bytes(&mut self) -> Result<Vec<u8>> {
        let n = self.u32()? as usize;
        if n > self.remaining() {
            return Err(Error::decode(format!(
                "length {} exceeds {} remaining bytes",
                n,
                self.remaining()
            )));
        }
        let mut b = vec![0; n];
        self.cur.read_exact(&mut b).map_err(read_err)?;
        Ok(b)
    }

    fn string(&mut self) -> Result<String> {
        String::from_utf8(self.bytes()?).map_err(|e| Error::decode(format!("invalid UTF-8: {}", e)))
    }

    fn qname(&mut self) -> Result<QName> {
        match self.codec {
            CODEC_RAW => parse_qname(&self.string()?),
            _ => {
                let id = self.u16()?;
                self.app
                    .qnames()
                    .qname(id)
                    .map_err(|e| Error::decode(e.to_string()))
            }
        }
    }

    fn container(&mut self) -> Result<String> {
        match self.codec {
            CODEC_RAW => self.string(),
            _ => {
                let id = self.u16()?;
                self.app
                    .containers()
                    .container(id)
                    .map(str::to_string)
                    .map_err(|e| Error::decode(e.to_string()))
            }
        }
    }

    fn field<'s>(&mut self, s: &'s Structure) -> Result<&'s Field> {
        match self.codec {
            CODEC_RAW => {
                let name = self.string()?;
                s.field(&name)
                    .ok_or_else(|| Error::decode(format!("field «{}» not found in {}", name, s)))
            }
            _ => {
                let idx = self.u16()?;
                s.fields()
                    .get(usize::from(idx))
                    .ok_or_else(|| Error::decode(format!("field #{} not found in {}", idx, s)))
            }
        }
    }

    fn value(&mut self) -> Result<Value> {
        let code = self.u8()?;
        let kind = DataKind::from_code(code)
            .ok_or_else(|| Error::decode(format!("unknown data kind code {}", code)))?;
        let v = match kind {
            DataKind::Int32 => Value::Int32(self.cur.read_i32::<BigEndian>().map_err(read_err)?),
            DataKind::Int64 => Value::Int64(self.i64()?),
            DataKind::Float32 => Value::Float32(self.cur.read_f32::<BigEndian>().map_err(read_err)?),
            DataKind::Float64 => Value::Float64(self.cur.read_f64::<BigEndian>().map_err(read_err)?),
            DataKind::Bytes => Value::Bytes(self.bytes()?),
            DataKind::String => Value::String(self.string()?),
            DataKind::QName => Value::QName(parse_qname(&self.string()?)?),
            DataKind::Bool => Value::Bool(self.u8()? != 0),
            DataKind::RecordID => Value::RecordID(RecordID(self.u64()?)),
            other => return Err(Error::decode(format!("{} values can not be stored", other.name()))),
        };
        Ok(v)
    }

    fn row(&mut self) -> Result<Row> {
        let app = Arc::clone(self.app.app_def());
        let mut row = Row::new(Arc::clone(&app));
        let qname = self.qname()?;
        if qname.is_null() {
            return Ok(row);
        }
        let s = app
            .structure(&qname)
            .ok_or_else(|| Error::decode(format!("stored type «{}» is not a structure", qname)))?;
        row.set_qname(qname.clone());
        row.set_id(RecordID(self.u64()?));
        row.set_parent(RecordID(self.u64()?));
        row.set_container(self.container()?);
        row.set_active(self.u8()? != 0);

        for _ in 0..self.u16()? {
            let field = self.field(s)?;
            let v = self.value()?;
            if v.data_kind() != field.data_kind() {
                return Err(Error::decode(format!(
                    "{} value stored in {} of {}",
                    v.data_kind().name(),
                    field,
                    s
                )));
            }
            row.set_raw_value(field.name().to_string(), v);
        }
        for _ in 0..self.u16()? {
            let field = self.field(s)?;
            row.set_raw_nil(field.name().to_string());
        }
        Ok(row)
    }

    fn object(&mut self) -> Result<Object> {
        let mut o = Object::from_row(self.row()?);
        for _ in 0..self.u16()? {
            let child = self.object()?;
            o.push_child(child);
        }
        Ok(o)
    }

    fn event(&mut self, prepared: &Arc<PreparedApp>) -> Result<Event> {
        let mut ev = Event::blank(Arc::clone(prepared));
        ev.partition = self.u16()?;
        ev.plog_offset = self.u64()?;
        ev.workspace = self.u64()?;
        ev.wlog_offset = self.u64()?;
        ev.name = self.qname()?;
        ev.registered_at = self.i64()?;
        ev.sync = self.u8()? != 0;
        if ev.sync {
            ev.device = self.u16()?;
            ev.synced_at = self.i64()?;
        }

        if self.u8()? == 0 {
            let message = self.string()?;
            let qname = parse_qname(&self.string()?)?;
            let bytes = self.bytes()?;
            ev.name = qname.clone();
            ev.raw_bytes = bytes.clone();
            ev.error = EventError {
                valid: false,
                message,
                qname,
                bytes,
            };
            ev.state = EventState::Invalid;
            return Ok(ev);
        }

        ev.arg = self.object()?;
        for _ in 0..self.u16()? {
            let row = self.row()?;
            ev.cud.push_create(row);
        }
        for _ in 0..self.u16()? {
            let row = self.row()?;
            ev.cud.push_update_changes(row);
        }
        ev.state = EventState::Built;
        Ok(ev)
    }
}

pub(crate) fn encode_into(ev: &Event, codec: u8, buf: &mut Vec<u8>) -> Result<()> {
    check_codec(codec)?;
    let mut w = Writer {
        codec,
        app: ev.prepared(),
        buf,
    };
    w.event(ev)
}

/// Encode the event with the given codec version
///
/// # Errors
///
/// Fails for an unknown version or a name without compact ID.
pub fn encode_event(ev: &Event, codec: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_into(ev, codec, &mut buf)?;
    Ok(buf)
}

/// Decode an event of any known codec version. The decoded event caches
/// the given bytes.
///
/// # Errors
///
/// `UnknownCodec` for an unknown version byte, `Decode` for truncated or
/// inconsistent bytes.
pub fn decode_event(prepared: &Arc<PreparedApp>, bytes: &[u8]) -> Result<Event> {
    let mut r = Reader::new(prepared, bytes)?;
    let ev = r.event(prepared)?;
    r.finish()?;
    let mut cached = prepared.pool().take();
    cached.extend_from_slice(bytes);
    if let Err(buf) = ev.bytes.set(cached) {
        prepared.pool().give(buf);
    }
    Ok(ev)
}

/// Encode a stored record with the latest codec version
pub(crate) fn encode_row(app: &PreparedApp, row: &Row) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut w = Writer {
        codec: CODEC_LAST,
        app,
        buf: &mut buf,
    };
    w.u8(CODEC_LAST)?;
    w.row(row)?;
    Ok(buf)
}

/// Decode a stored record
pub(crate) fn decode_row(app: &PreparedApp, bytes: &[u8]) -> Result<Row> {
    let mut r = Reader::new(app, bytes)?;
    let row = r.row()?;
    r.finish()?;
    Ok(row)
}
