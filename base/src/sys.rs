// Copyright 2022 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

cfg_if::cfg_if! {
    if #[cfg(target_os = "android")] {
        pub(crate) mod android;
        pub(crate) use android as platform;
    } else if #[cfg(unix)] {
        pub(crate) mod linux;
        pub(crate) use linux as platform;
    } else {
        compile_error!("Unsupported platform");
    }
}
