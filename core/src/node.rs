//! Owned libmpv node trees.
//!
//! libmpv reads command arguments and property values as an [`mpv_node`] tree
//! whose strings, lists and byte arrays are borrowed from the caller. An
//! [`OwnedNode`] is that caller: it keeps one owning container per nested level
//! and derives the borrowed view from it.
//!
//! Every container is filled to its final size before a pointer into it is
//! taken, and everything a pointer can reach lives on the heap. Moving an
//! [`OwnedNode`] therefore only moves the handle; the view stays valid for as
//! long as the value is alive.
//!
//! # Lossy degradation
//!
//! Neither direction fails. [`OwnedNode::from_host`] maps `Null` to a `NONE`
//! node and truncates strings at an interior NUL, since libmpv could not read
//! past it. [`node_to_host`] maps unknown formats and null payload pointers to
//! [`HostValue::Null`].

use alloc::boxed::Box;
use alloc::ffi::CString;
use alloc::string::String;
use alloc::vec::Vec;
use core::ffi::{CStr, c_char, c_int, c_void};
use core::ptr;

use crate::sys::{
    MPV_FORMAT_BYTE_ARRAY, MPV_FORMAT_DOUBLE, MPV_FORMAT_FLAG, MPV_FORMAT_INT64,
    MPV_FORMAT_NODE_ARRAY, MPV_FORMAT_NODE_MAP, MPV_FORMAT_NONE, MPV_FORMAT_STRING,
    mpv_byte_array, mpv_format, mpv_node, mpv_node_list, mpv_node_u,
};
use crate::value::{HostValue, Map};

/// An [`mpv_node`] together with all the memory it points to.
///
/// Move-only: copying the view without its storage would leave dangling
/// pointers behind, so neither `Clone` nor `Copy` is provided.
pub struct OwnedNode {
    node: mpv_node,
    // Only held so the view's pointers stay valid.
    _storage: Storage,
}

enum Storage {
    /// Scalars live inside the node itself.
    Inline,
    String { _text: CString },
    List { _list: Box<ListStorage> },
    Bytes {
        _bytes: Box<[u8]>,
        _record: Box<mpv_byte_array>,
    },
}

struct ListStorage {
    /// Owns the storage of every nested value.
    _children: Vec<OwnedNode>,
    _keys: Vec<CString>,
    values: Vec<mpv_node>,
    key_ptrs: Vec<*mut c_char>,
    list: mpv_node_list,
}

impl OwnedNode {
    /// Build an owned tree from a host value.
    #[must_use]
    pub fn from_host(value: &HostValue) -> Self {
        match value {
            HostValue::Null => Self::inline(mpv_node::NONE),
            HostValue::Bool(flag) => Self::inline(mpv_node {
                u: mpv_node_u {
                    flag: c_int::from(*flag),
                },
                format: MPV_FORMAT_FLAG,
            }),
            HostValue::Int(int64) => Self::inline(mpv_node {
                u: mpv_node_u { int64: *int64 },
                format: MPV_FORMAT_INT64,
            }),
            HostValue::Double(double_) => Self::inline(mpv_node {
                u: mpv_node_u { double_: *double_ },
                format: MPV_FORMAT_DOUBLE,
            }),
            HostValue::String(text) => Self::string(c_string(text)),
            HostValue::ByteBuffer(bytes) => Self::bytes(bytes),
            HostValue::Array(items) => {
                let children = items.iter().map(Self::from_host).collect();
                Self::list(children, None)
            }
            HostValue::Map(map) => {
                let mut keys = Vec::with_capacity(map.len());
                let mut children = Vec::with_capacity(map.len());
                for (key, value) in map.iter() {
                    keys.push(c_string(key));
                    children.push(Self::from_host(value));
                }
                Self::list(children, Some(keys))
            }
        }
    }

    const fn inline(node: mpv_node) -> Self {
        Self {
            node,
            _storage: Storage::Inline,
        }
    }

    fn string(text: CString) -> Self {
        let node = mpv_node {
            u: mpv_node_u {
                string: text.as_ptr().cast_mut(),
            },
            format: MPV_FORMAT_STRING,
        };
        Self {
            node,
            _storage: Storage::String { _text: text },
        }
    }

    fn bytes(bytes: &[u8]) -> Self {
        let bytes: Box<[u8]> = bytes.into();
        let mut record = Box::new(mpv_byte_array {
            data: bytes.as_ptr().cast_mut().cast::<c_void>(),
            size: bytes.len(),
        });
        let node = mpv_node {
            u: mpv_node_u {
                ba: ptr::addr_of_mut!(*record),
            },
            format: MPV_FORMAT_BYTE_ARRAY,
        };
        Self {
            node,
            _storage: Storage::Bytes {
                _bytes: bytes,
                _record: record,
            },
        }
    }

    /// `keys` is `Some` for maps and must then be index-aligned with `children`.
    fn list(children: Vec<Self>, keys: Option<Vec<CString>>) -> Self {
        let format = if keys.is_some() {
            MPV_FORMAT_NODE_MAP
        } else {
            MPV_FORMAT_NODE_ARRAY
        };
        let keys = keys.unwrap_or_default();
        debug_assert!(format == MPV_FORMAT_NODE_ARRAY || keys.len() == children.len());

        // Both vectors are complete here; their buffers never reallocate again.
        let values: Vec<mpv_node> = children.iter().map(|child| child.node).collect();
        let key_ptrs: Vec<*mut c_char> = keys.iter().map(|key| key.as_ptr().cast_mut()).collect();

        let mut storage = Box::new(ListStorage {
            _children: children,
            _keys: keys,
            values,
            key_ptrs,
            list: mpv_node_list {
                num: 0,
                values: ptr::null_mut(),
                keys: ptr::null_mut(),
            },
        });

        storage.list = mpv_node_list {
            num: c_int::try_from(storage.values.len()).unwrap_or(c_int::MAX),
            values: storage.values.as_mut_ptr(),
            keys: if format == MPV_FORMAT_NODE_MAP {
                storage.key_ptrs.as_mut_ptr()
            } else {
                ptr::null_mut()
            },
        };

        let node = mpv_node {
            u: mpv_node_u {
                list: ptr::addr_of_mut!(storage.list),
            },
            format,
        };
        Self {
            node,
            _storage: Storage::List { _list: storage },
        }
    }

    /// The borrowed view handed to libmpv.
    #[must_use]
    pub const fn node(&self) -> &mpv_node {
        &self.node
    }

    /// Format code of the root node.
    #[must_use]
    pub const fn format(&self) -> mpv_format {
        self.node.format
    }

    /// Whether the value converted to nothing.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.node.format == MPV_FORMAT_NONE
    }

    /// libmpv takes `mpv_node *` even for arguments it only reads.
    #[must_use]
    pub const fn as_mut_ptr(&mut self) -> *mut mpv_node {
        &mut self.node
    }

    /// Read the view back into a host value.
    #[must_use]
    pub fn to_host(&self) -> HostValue {
        // SAFETY: every pointer in the view targets storage owned by `self`.
        unsafe { node_to_host(&self.node) }
    }
}

impl core::fmt::Debug for OwnedNode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OwnedNode")
            .field("value", &self.to_host())
            .finish()
    }
}

fn c_string(text: &str) -> CString {
    let bytes = text.as_bytes();
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    CString::new(&bytes[..end]).unwrap_or_default()
}

/// Copy a C string into an owned `String`, replacing invalid UTF-8.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
#[must_use]
pub unsafe fn read_c_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

/// Convert an engine tree into a host value.
///
/// # Safety
///
/// `node` must be a well-formed tree: every pointer selected by a format code
/// must be valid for reads, and list counts must match their arrays.
#[must_use]
pub unsafe fn node_to_host(node: &mpv_node) -> HostValue {
    // SAFETY: the union field read in each arm is the one selected by `format`.
    unsafe {
        match node.format {
            MPV_FORMAT_NONE => HostValue::Null,
            MPV_FORMAT_STRING => read_c_str(node.u.string).map_or(HostValue::Null, HostValue::String),
            MPV_FORMAT_FLAG => HostValue::Bool(node.u.flag != 0),
            MPV_FORMAT_INT64 => HostValue::Int(node.u.int64),
            MPV_FORMAT_DOUBLE => HostValue::Double(node.u.double_),
            MPV_FORMAT_NODE_ARRAY => node.u.list.as_ref().map_or(HostValue::Null, |list| {
                HostValue::Array(list_values(list).iter().map(|v| node_to_host(v)).collect())
            }),
            MPV_FORMAT_NODE_MAP => node.u.list.as_ref().map_or(HostValue::Null, |list| {
                let values = list_values(list);
                let mut map = Map::with_capacity(values.len());
                for (index, value) in values.iter().enumerate() {
                    let key = if list.keys.is_null() {
                        String::new()
                    } else {
                        read_c_str(*list.keys.add(index)).unwrap_or_default()
                    };
                    map.insert(key, node_to_host(value));
                }
                HostValue::Map(map)
            }),
            MPV_FORMAT_BYTE_ARRAY => node.u.ba.as_ref().map_or(HostValue::Null, |ba| {
                if ba.data.is_null() || ba.size == 0 {
                    HostValue::ByteBuffer(Vec::new())
                } else {
                    let bytes = core::slice::from_raw_parts(ba.data.cast::<u8>(), ba.size);
                    HostValue::ByteBuffer(bytes.to_vec())
                }
            }),
            _ => HostValue::Null,
        }
    }
}

unsafe fn list_values(list: &mpv_node_list) -> &[mpv_node] {
    let len = usize::try_from(list.num).unwrap_or(0);
    if list.values.is_null() || len == 0 {
        &[]
    } else {
        // SAFETY: the caller guarantees `values` holds `num` nodes.
        unsafe { core::slice::from_raw_parts(list.values, len) }
    }
}
