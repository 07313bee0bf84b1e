//! Null-terminated arrays of C strings (`argv`, `envp`).

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

/// Owned `char *[]` with a trailing null pointer.
///
/// The pointer array borrows from the owned strings; both are freed together
/// when the value is dropped. The raw pointers make this type `!Send`, which
/// keeps every array local to the request that built it.
pub struct CStringArray {
    items: Vec<CString>,
    ptrs: Vec<*const c_char>,
}

impl CStringArray {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut ptrs = Vec::with_capacity(capacity + 1);
        ptrs.push(ptr::null());
        Self {
            items: Vec::with_capacity(capacity),
            ptrs,
        }
    }

    pub fn push(&mut self, item: CString) {
        // The heap buffer of a CString does not move when `items` grows.
        let len = self.ptrs.len();
        self.ptrs[len - 1] = item.as_ptr();
        self.ptrs.push(ptr::null());
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CStr> {
        self.items.iter().map(|item| item.as_c_str())
    }

    /// Pointer suitable for `execve`-style `argv`/`envp` parameters.
    pub fn as_ptr(&self) -> *const *const c_char {
        self.ptrs.as_ptr()
    }
}

impl FromIterator<CString> for CStringArray {
    fn from_iter<I: IntoIterator<Item = CString>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut array = Self::with_capacity(iter.size_hint().0);
        for item in iter {
            array.push(item);
        }
        array
    }
}

impl std::fmt::Debug for CStringArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}
