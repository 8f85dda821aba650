// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::{PakeError, ProtocolError};

/// Corresponds to the I2OSP() function from RFC8017; fails when the input
/// does not fit in `length` bytes
pub(crate) fn i2osp(input: usize, length: usize) -> Result<Vec<u8>, ProtocolError> {
    let sizeof_usize = core::mem::size_of::<usize>();
    if length < sizeof_usize && (input >> (8 * length)) != 0 {
        return Err(PakeError::SerializationError.into());
    }
    if length <= sizeof_usize {
        return Ok((&input.to_be_bytes()[sizeof_usize - length..]).to_vec());
    }
    let mut output = vec![0u8; length];
    output[length - sizeof_usize..].copy_from_slice(&input.to_be_bytes());
    Ok(output)
}

/// Corresponds to the OS2IP() function from RFC8017
pub(crate) fn os2ip(input: &[u8]) -> Result<usize, ProtocolError> {
    if input.len() > core::mem::size_of::<usize>() {
        return Err(PakeError::SerializationError.into());
    }
    let mut output_array = [0u8; core::mem::size_of::<usize>()];
    output_array[core::mem::size_of::<usize>() - input.len()..].copy_from_slice(input);
    Ok(usize::from_be_bytes(output_array))
}

/// Prefixes the input with its length, encoded in big-endian over
/// `max_bytes` bytes; fails when the input is too long for the prefix
pub(crate) fn serialize(input: &[u8], max_bytes: usize) -> Result<Vec<u8>, ProtocolError> {
    Ok([&i2osp(input.len(), max_bytes)?[..], input].concat())
}

/// Inverse of [`serialize`]: splits off one length-prefixed chunk and
/// returns it along with the remainder of the input
pub(crate) fn tokenize(
    input: &[u8],
    size_bytes: usize,
) -> Result<(Vec<u8>, Vec<u8>), ProtocolError> {
    if size_bytes > core::mem::size_of::<usize>() || input.len() < size_bytes {
        return Err(PakeError::SerializationError.into());
    }

    let size = os2ip(&input[..size_bytes])?;
    if size_bytes + size > input.len() {
        return Err(PakeError::SerializationError.into());
    }

    Ok((
        input[size_bytes..size_bytes + size].to_vec(),
        input[size_bytes + size..].to_vec(),
    ))
}
