//! Parsers for individual javacore lines.
//!
//! Each function takes the text after the tag and returns `None` when the
//! line does not have the expected shape.

use chrono::NaiveDateTime;

use crate::model::{COMPILED, INTERPRETED};
use crate::types::Address;

/// Parse a `0x…` pointer, ignoring surrounding whitespace and punctuation.
pub fn pointer(text: &str) -> Option<Address>
{
    let text = text.trim().trim_end_matches([',', ')', ':']);
    if !(text.starts_with("0x") || text.starts_with("0X")) {
        return None;
    }
    Address::parse_hex(text)
}

/// Parse a number written either as `0x…` hex or as decimal.
pub fn number(text: &str) -> Option<u64>
{
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

/// Value following `key` up to the next `,` or `)`.
pub fn field<'a>(text: &'a str, key: &str) -> Option<&'a str>
{
    let start = text.find(key)? + key.len();
    let rest = &text[start..];
    let end = rest.find([',', ')']).unwrap_or(rest.len());
    Some(rest[..end].trim())
}

/// An object reference written as `class/Name@0x…`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef
{
    pub class_name: String,
    pub address: Address,
}

/// Parse `java/lang/Object@0x00000000E0001234`.
pub fn object_ref(text: &str) -> Option<ObjectRef>
{
    let (class_name, address) = text.trim().rsplit_once('@')?;
    Some(ObjectRef {
        class_name: class_name.to_string(),
        address: pointer(address)?,
    })
}

/// `3XMTHREADINFO` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadInfo
{
    pub name: String,
    pub vm_thread: Address,
    pub os_thread: Option<Address>,
    pub thread_object: Option<Address>,
    pub state: Option<String>,
    pub priority: Option<i32>,
}

/// Parse `"main" J9VMThread:0x…, omrthread_t:0x…, java/lang/Thread:0x…, state:R, prio=5`.
pub fn thread_info(text: &str) -> Option<ThreadInfo>
{
    let text = text.trim();
    let quoted = text.strip_prefix('"')?;
    let (name, rest) = quoted.rsplit_once("\" J9VMThread:")?;
    let rest = format!("J9VMThread:{rest}");
    Some(ThreadInfo {
        name: name.to_string(),
        vm_thread: pointer(field(&rest, "J9VMThread:")?)?,
        os_thread: field(&rest, "omrthread_t:").and_then(pointer).filter(|a| *a != Address::ZERO),
        thread_object: field(&rest, "java/lang/Thread:")
            .and_then(pointer)
            .filter(|a| *a != Address::ZERO),
        state: field(&rest, "state:").map(str::to_string),
        priority: field(&rest, "prio=").and_then(|p| p.parse().ok()),
    })
}

/// `3XMTHREADINFO1` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeThreadInfo
{
    pub native_id: u64,
    pub priority: Option<String>,
    pub policy: Option<String>,
}

/// Parse `(native thread ID:0x5E03, native priority:0x5, native policy:UNKNOWN, …)`.
pub fn native_thread_info(text: &str) -> Option<NativeThreadInfo>
{
    Some(NativeThreadInfo {
        native_id: number(field(text, "native thread ID:")?)?,
        priority: field(text, "native priority:").map(str::to_string),
        policy: field(text, "native policy:").map(str::to_string),
    })
}

/// Parse `(native stack address range from:0x…, to:0x… (1024 KB))`.
pub fn stack_range(text: &str) -> Option<(Address, Address)>
{
    let bound = |key: &str| field(text, key).and_then(|value| value.split_whitespace().next()).and_then(pointer);
    Some((bound("from:")?, bound("to:")?))
}

/// Parse `Blocked on: java/lang/Object@0x… Owned by: …` (also `Waiting on:`
/// and `Parked on:`) into the blocking object.
pub fn blocking_object(text: &str) -> Option<ObjectRef>
{
    let (_, rest) = text.split_once(" on: ")?;
    let object = rest.split(" Owned by:").next()?;
    object_ref(object)
}

/// One `4XESTACKTRACE` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame
{
    pub class_name: String,
    pub method_name: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    /// [`COMPILED`], [`INTERPRETED`], or `None` for native methods.
    pub compilation: Option<&'static str>,
}

/// Parse `at a/b/C.m(File.java:12)` and its variants.
pub fn stack_frame(text: &str) -> Option<Frame>
{
    let text = text.trim().strip_prefix("at ")?;
    let open = text.find('(')?;
    let (qualified, source) = text.split_at(open);
    let (class_name, method_name) = qualified.rsplit_once('.')?;
    if class_name.is_empty() || method_name.is_empty() {
        return None;
    }

    let mut source = source.strip_prefix('(')?.strip_suffix(')').unwrap_or(&source[1..]);
    let mut compilation = Some(INTERPRETED);
    if let Some(stripped) = source.strip_suffix("(Compiled Code)") {
        source = stripped;
        compilation = Some(COMPILED);
    }
    if source == "Compiled Code" {
        source = "";
        compilation = Some(COMPILED);
    }

    let (file, line) = if source == "Native Method" {
        compilation = None;
        (None, None)
    } else if source.is_empty() || source.starts_with("Bytecode PC:") {
        (None, None)
    } else {
        match source.rsplit_once(':') {
            Some((file, line)) => match line.trim().parse() {
                Ok(line) => (Some(file.to_string()), Some(line)),
                Err(_) => (Some(source.to_string()), None),
            },
            None => (Some(source.to_string()), None),
        }
    };

    Some(Frame {
        class_name: class_name.to_string(),
        method_name: method_name.to_string(),
        file,
        line,
        compilation,
    })
}

/// `2CLTEXTCLLOAD` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderInfo
{
    pub name: String,
    pub object: Address,
}

/// Parse `Loader *System*(0x…)` or `Loader sun/misc/Launcher$AppClassLoader(0x…)`.
pub fn class_loader(text: &str) -> Option<LoaderInfo>
{
    let text = text.trim().strip_prefix("Loader ")?;
    let (name, rest) = text.rsplit_once('(')?;
    Some(LoaderInfo {
        name: name.to_string(),
        object: pointer(rest)?,
    })
}

/// Parse `java/lang/String(0x…)` or `java/lang/String(0x… shared)`.
pub fn class_entry(text: &str) -> Option<(String, Address)>
{
    let (name, rest) = text.trim().rsplit_once('(')?;
    let address = rest.trim_end_matches(')').split_whitespace().next()?;
    Some((name.to_string(), pointer(address)?))
}

/// Owner of a monitor as written after the monitor description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner
{
    Unowned,
    /// `owner "name" (J9VMThread:0x…)` or `Flat locked by "name" (J9VMThread:0x…)`.
    VmThread(Address),
    /// `owner "name" (native thread ID:0x…)` for threads unknown to the VM.
    Native(u64),
}

/// Parse the owner clause of a `3LKMONOBJECT` or `2LKREGMON` line.
pub fn owner(text: &str) -> Option<Owner>
{
    if text.contains("<unowned>") {
        return Some(Owner::Unowned);
    }
    if let Some(vm_thread) = field(text, "(J9VMThread:") {
        return pointer(vm_thread).map(Owner::VmThread);
    }
    field(text, "(native thread ID:").and_then(number).map(Owner::Native)
}

/// `3LKMONOBJECT` payload: the object and the owner clause.
pub fn monitor_object(text: &str) -> Option<(ObjectRef, Owner)>
{
    let (object, rest) = text.trim().split_once(": ")?;
    Some((object_ref(object)?, owner(rest)?))
}

/// Parse `sys_mon_t:0x… infl_mon_t: 0x…:` into the monitor address.
pub fn monitor_in_use(text: &str) -> Option<Address>
{
    let rest = text.trim().strip_prefix("sys_mon_t:")?;
    pointer(rest.split_whitespace().next()?)
}

/// `2LKREGMON` payload: name, monitor address and owner clause.
pub fn registered_monitor(text: &str) -> Option<(Option<String>, Address, Owner)>
{
    let (name, rest) = text.trim().split_once(" lock (")?;
    let (address, rest) = rest.split_once(')')?;
    let name = (name != "[system]").then(|| name.to_string());
    Some((name, pointer(address)?, owner(rest)?))
}

/// Parse `"name" (J9VMThread:0x…)` into the thread address.
pub fn waiter(text: &str) -> Option<Address>
{
    field(text, "(J9VMThread:").and_then(pointer)
}

/// One `nMEMUSER` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRow
{
    pub depth: usize,
    pub name: String,
    pub bytes: u64,
    pub allocations: u64,
}

/// Parse a memory category row. `level` is the number in the tag; separator
/// rows yield `None`.
pub fn memory_row(level: usize, text: &str) -> Option<MemoryRow>
{
    let text = text.trim();
    let text = match text.rfind("+--") {
        Some(branch) => &text[branch + 3..],
        None => text,
    };
    let (name, counts) = text.rsplit_once(": ")?;
    let (bytes, allocations) = counts.split_once(" bytes / ")?;
    let allocations = allocations.split_whitespace().next()?;
    Some(MemoryRow {
        depth: level.checked_sub(1)?,
        name: name.to_string(),
        bytes: bytes.replace(',', "").parse().ok()?,
        allocations: allocations.parse().ok()?,
    })
}

/// `2CIUSERARG` payload: the option and its optional extra-info pointer.
pub fn user_arg(text: &str) -> (String, Option<Address>)
{
    let text = text.trim();
    if let Some((option, extra)) = text.rsplit_once(' ') {
        if let Some(extra) = pointer(extra) {
            return (option.trim_end().to_string(), Some(extra));
        }
    }
    (text.to_string(), None)
}

/// `1STHEAPREGION` payload: base address, size and region name.
pub fn heap_region(text: &str) -> Option<(Address, u64, String)>
{
    let mut fields = text.split_whitespace();
    let _id = fields.next()?;
    let start = pointer(fields.next()?)?;
    let _end = fields.next()?;
    let size = number(fields.next()?)?;
    let name = fields.collect::<Vec<_>>().join(" ");
    Some((start, size, name))
}

/// `1STHEAPSPACE` payload: the space name after the placeholder columns.
pub fn heap_space(text: &str) -> Option<String>
{
    let name = match text.rfind("--") {
        Some(last) => &text[last + 2..],
        None => text.split_whitespace().last()?,
    };
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Parse `2024/01/02 at 10:10:10:123` into milliseconds since the epoch.
///
/// The dump does not record its time zone, so the time is read as UTC.
pub fn timestamp(text: &str) -> Option<i64>
{
    let text = text.trim();
    let (seconds, millis) = text.rsplit_once(':')?;
    let millis: i64 = millis.parse().ok().filter(|millis| (0..=999).contains(millis))?;
    let time = NaiveDateTime::parse_from_str(seconds, "%Y/%m/%d at %H:%M:%S").ok()?;
    time.and_utc().timestamp_millis().checked_add(millis)
}
