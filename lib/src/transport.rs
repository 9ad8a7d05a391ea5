//! Transport abstraction for reaching Cardano apps
//!
// Copyright (c) 2022-2023 The MobileCoin Foundation

use core::fmt::{Debug, Display};
use std::convert::Infallible;

use async_trait::async_trait;

#[cfg(feature = "transport_tcp")]
pub use tcp::{TcpExchange, TcpOptions};

/// Byte-level exchange with a device
///
/// Implementations send one framed command and return the response status
/// word alongside the (possibly empty) response payload. Sequencing, status
/// checking and payload decoding live above this seam.
#[async_trait]
pub trait Exchange {
    type Error: Display + Debug + Send;

    /// Send a framed APDU, returning `(status, payload)`
    async fn exchange(&mut self, command: &[u8]) -> Result<(u16, Vec<u8>), Self::Error>;
}

#[cfg(feature = "transport_tcp")]
mod tcp {
    use std::net::SocketAddr;

    use async_trait::async_trait;
    use log::trace;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpStream,
    };

    use super::Exchange;

    /// TCP connection options for a speculos emulator APDU socket
    #[derive(Clone, Debug, PartialEq, clap::Args)]
    pub struct TcpOptions {
        /// Address of the speculos APDU port
        #[clap(long, default_value = "127.0.0.1:9999", env = "LEDGER_ADA_TARGET")]
        pub target: SocketAddr,
    }

    impl Default for TcpOptions {
        fn default() -> Self {
            Self {
                target: SocketAddr::from(([127, 0, 0, 1], 9999)),
            }
        }
    }

    /// TCP [`Exchange`] speaking the speculos wire protocol
    ///
    /// Commands are sent as a four byte big-endian length followed by the
    /// framed APDU. Responses arrive as a four byte big-endian payload
    /// length, the payload, then the two byte status word.
    pub struct TcpExchange {
        stream: TcpStream,
    }

    impl TcpExchange {
        /// Connect to a speculos APDU socket
        pub async fn connect(opts: &TcpOptions) -> Result<Self, std::io::Error> {
            let stream = TcpStream::connect(opts.target).await?;
            Ok(Self { stream })
        }
    }

    #[async_trait]
    impl Exchange for TcpExchange {
        type Error = std::io::Error;

        async fn exchange(&mut self, command: &[u8]) -> Result<(u16, Vec<u8>), Self::Error> {
            trace!("send: {:02x?}", command);

            self.stream.write_u32(command.len() as u32).await?;
            self.stream.write_all(command).await?;
            self.stream.flush().await?;

            let len = self.stream.read_u32().await? as usize;

            let mut body = vec![0u8; len];
            self.stream.read_exact(&mut body).await?;

            let status = self.stream.read_u16().await?;

            trace!("recv: 0x{:04x} {:02x?}", status, body);

            Ok((status, body))
        }
    }
}

/// Scripted reply for a [`RecordingExchange`], keyed on `(INS, P1, P2)`
type Reply = ((u8, u8, u8), (u16, Vec<u8>));

/// In-memory [`Exchange`] for exercising sequencers without a device
///
/// Records every outgoing frame and answers from a table of scripted
/// replies keyed on the instruction and parameter bytes. Unscripted
/// commands succeed with an empty payload, matching the device stages
/// that return status only.
#[derive(Clone, Debug, Default)]
pub struct RecordingExchange {
    frames: Vec<Vec<u8>>,
    replies: Vec<Reply>,
}

impl RecordingExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the reply for commands matching `(ins, p1, p2)`
    pub fn with_reply(mut self, ins: u8, p1: u8, p2: u8, status: u16, body: &[u8]) -> Self {
        self.replies.push(((ins, p1, p2), (status, body.to_vec())));
        self
    }

    /// Frames sent so far, in order
    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }

    /// `(INS, P1, P2)` header triples of the frames sent so far
    pub fn stages(&self) -> Vec<(u8, u8, u8)> {
        self.frames.iter().map(|f| (f[1], f[2], f[3])).collect()
    }
}

#[async_trait]
impl Exchange for RecordingExchange {
    type Error = Infallible;

    async fn exchange(&mut self, command: &[u8]) -> Result<(u16, Vec<u8>), Self::Error> {
        self.frames.push(command.to_vec());

        let key = (command[1], command[2], command[3]);
        let r = self
            .replies
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, r)| r.clone())
            .unwrap_or((0x9000, vec![]));

        Ok(r)
    }
}
