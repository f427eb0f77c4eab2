// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Client certificate material for mutually authenticated TLS.

use std::fmt;
use std::path::Path;

use rumqttc::Transport;

use crate::error::ConfigError;

const PEM_MARKER: &[u8] = b"-----BEGIN ";

/// Root CA, client certificate and private key, all PEM encoded.
#[derive(Clone)]
pub struct TlsIdentity {
    root_ca: Vec<u8>,
    certificate: Vec<u8>,
    private_key: Vec<u8>,
}

impl TlsIdentity {
    /// Reads the three PEM files.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if a file cannot be read and
    /// `ConfigError::InvalidPem` if it holds no PEM block.
    pub fn from_files(
        root_ca: impl AsRef<Path>,
        certificate: impl AsRef<Path>,
        private_key: impl AsRef<Path>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            root_ca: read_pem(root_ca.as_ref())?,
            certificate: read_pem(certificate.as_ref())?,
            private_key: read_pem(private_key.as_ref())?,
        })
    }

    /// Builds the rumqttc transport, offering `alpn` during the handshake.
    pub(crate) fn into_transport(self, alpn: &[String]) -> Transport {
        let alpn = if alpn.is_empty() {
            None
        } else {
            Some(alpn.iter().map(|p| p.as_bytes().to_vec()).collect())
        };

        Transport::tls(self.root_ca, Some((self.certificate, self.private_key)), alpn)
    }
}

impl fmt::Debug for TlsIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsIdentity")
            .field("root_ca", &format_args!("{} bytes", self.root_ca.len()))
            .field("certificate", &format_args!("{} bytes", self.certificate.len()))
            .field("private_key", &"<redacted>")
            .finish()
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>, ConfigError> {
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if !bytes.windows(PEM_MARKER.len()).any(|w| w == PEM_MARKER) {
        return Err(ConfigError::InvalidPem(path.to_path_buf()));
    }

    Ok(bytes)
}
