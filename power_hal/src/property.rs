// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Read-only access to system properties.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use base::warn;

/// Where system property values come from.
pub trait PropertySource {
    fn get(&self, name: &str) -> Option<String>;

    fn get_int(&self, name: &str) -> Option<i32> {
        let value = self.get(name)?;
        match value.trim().parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("property {} has non-integer value {:?}", name, value);
                None
            }
        }
    }
}

/// The Android property service.
#[cfg(target_os = "android")]
pub struct SystemProperties;

#[cfg(target_os = "android")]
impl PropertySource for SystemProperties {
    fn get(&self, name: &str) -> Option<String> {
        use std::ffi::CStr;
        use std::ffi::CString;

        let name = CString::new(name).ok()?;
        let mut value = [0 as libc::c_char; libc::PROP_VALUE_MAX as usize];
        // SAFETY: `name` is NUL terminated and `value` holds PROP_VALUE_MAX bytes, the most the
        // property service writes.
        let len = unsafe { libc::__system_property_get(name.as_ptr(), value.as_mut_ptr()) };
        if len <= 0 {
            return None;
        }
        // SAFETY: the property service NUL terminates the value it wrote.
        let value = unsafe { CStr::from_ptr(value.as_ptr()) };
        Some(value.to_string_lossy().into_owned())
    }
}

/// Properties loaded from a `build.prop` style file: `key=value` lines, `#` comments.
#[derive(Debug, Default)]
pub struct PropertyFile {
    values: BTreeMap<String, String>,
}

impl PropertyFile {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    pub fn parse(content: &str) -> Self {
        let values = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        PropertyFile { values }
    }
}

impl PropertySource for PropertyFile {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_build_prop() {
        let props = PropertyFile::parse(
            "# power\n\
             persist.sys.NV_PBC_PWR_LIMIT = 9000\n\
             ro.hardware=foster\n\
             garbage line\n",
        );
        assert_eq!(props.get("ro.hardware").as_deref(), Some("foster"));
        assert_eq!(props.get_int("persist.sys.NV_PBC_PWR_LIMIT"), Some(9000));
        assert_eq!(props.get("garbage line"), None);
    }

    #[test]
    fn non_integer_is_ignored() {
        let props = PropertyFile::parse("persist.sys.NV_PBC_PWR_LIMIT=max\n");
        assert_eq!(props.get_int("persist.sys.NV_PBC_PWR_LIMIT"), None);
        assert_eq!(PropertyFile::empty().get_int("persist.sys.NV_PBC_PWR_LIMIT"), None);
    }
}
