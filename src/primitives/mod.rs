// Copyright (c) 2022 The Nakaflow developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

mod boundary;
mod observation;
mod stat;

pub use crate::primitives::boundary::*;
pub use crate::primitives::observation::*;
pub use crate::primitives::stat::*;
