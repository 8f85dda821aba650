// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Includes instantiations of key exchange protocols used in the login step
//! of OPAQUE

pub mod traits;
pub mod tripledh;
