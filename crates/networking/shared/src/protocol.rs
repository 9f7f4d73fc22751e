//! Binary wire protocol for entity synchronisation.
//!
//! Every message is a single frame with a fixed header followed by a
//! kind-specific payload. All multi-byte fields are big-endian.
//!
//! Layout:
//! - 4 bytes: payload length (u32), bytes following the header
//! - 1 byte: message kind
//! - 16 bytes: sender identity (high 64 bits, then low 64 bits)
//! - N bytes: payload (see [`MessageKind::payload_len`])
//!
//! The protocol is symmetric: the client encodes its own reports with the same
//! layout the server uses for broadcasts.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{DecodeError, NETWORK_IDENTITY_LEN, NULL_IDENTITY, NetworkIdentity};

/// Size of the fixed header in bytes.
pub const HEADER_LEN: usize = 4 + 1 + NETWORK_IDENTITY_LEN;

const POSE_LEN: usize = 3 * 4;

/// Discriminant byte of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    Connect = 0,
    Disconnect = 1,
    UpdateLocalPlayer = 2,
    Update = 3,
    RemoveProjectile = 4,
}

impl MessageKind {
    pub const ALL: [MessageKind; 5] = [
        MessageKind::Connect,
        MessageKind::Disconnect,
        MessageKind::UpdateLocalPlayer,
        MessageKind::Update,
        MessageKind::RemoveProjectile,
    ];

    /// Exact payload size carried by this kind.
    pub const fn payload_len(self) -> usize {
        match self {
            MessageKind::Connect | MessageKind::Disconnect => 0,
            MessageKind::UpdateLocalPlayer => POSE_LEN,
            MessageKind::Update => NETWORK_IDENTITY_LEN + POSE_LEN,
            MessageKind::RemoveProjectile => 2 * NETWORK_IDENTITY_LEN,
        }
    }

    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MessageKind {
    type Error = DecodeError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        MessageKind::ALL
            .into_iter()
            .find(|kind| kind.as_byte() == byte)
            .ok_or(DecodeError::UnknownKind(byte))
    }
}

/// Position and rotation (degrees) as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose2 {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
}

impl Pose2 {
    pub const fn new(x: f32, y: f32, rotation: f32) -> Self {
        Self { x, y, rotation }
    }

    fn write(&self, out: &mut BytesMut) {
        out.put_f32(self.x);
        out.put_f32(self.y);
        out.put_f32(self.rotation);
    }

    fn read(buf: &mut &[u8]) -> Self {
        Self {
            x: buf.get_f32(),
            y: buf.get_f32(),
            rotation: buf.get_f32(),
        }
    }
}

/// Kind-specific part of a message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MessageBody {
    /// The sender joined.
    Connect,
    /// The sender left.
    Disconnect,
    /// The sender reports its own pose.
    UpdateLocalPlayer { pose: Pose2 },
    /// Pose of an arbitrary entity, independent of the sender.
    Update {
        target: NetworkIdentity,
        pose: Pose2,
    },
    /// A bolt was destroyed. `hit_target` is [`NULL_IDENTITY`] when it hit nothing.
    RemoveProjectile {
        projectile: NetworkIdentity,
        hit_target: NetworkIdentity,
    },
}

impl MessageBody {
    pub fn kind(&self) -> MessageKind {
        match self {
            MessageBody::Connect => MessageKind::Connect,
            MessageBody::Disconnect => MessageKind::Disconnect,
            MessageBody::UpdateLocalPlayer { .. } => MessageKind::UpdateLocalPlayer,
            MessageBody::Update { .. } => MessageKind::Update,
            MessageBody::RemoveProjectile { .. } => MessageKind::RemoveProjectile,
        }
    }
}

/// A decoded protocol message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Message {
    pub sender: NetworkIdentity,
    pub body: MessageBody,
}

impl Message {
    pub const fn new(sender: NetworkIdentity, body: MessageBody) -> Self {
        Self { sender, body }
    }

    pub const fn connect(sender: NetworkIdentity) -> Self {
        Self::new(sender, MessageBody::Connect)
    }

    pub const fn disconnect(sender: NetworkIdentity) -> Self {
        Self::new(sender, MessageBody::Disconnect)
    }

    pub const fn update_local_player(sender: NetworkIdentity, pose: Pose2) -> Self {
        Self::new(sender, MessageBody::UpdateLocalPlayer { pose })
    }

    pub const fn update(sender: NetworkIdentity, target: NetworkIdentity, pose: Pose2) -> Self {
        Self::new(sender, MessageBody::Update { target, pose })
    }

    /// Bolt removal; pass `None` when the bolt did not hit anything.
    pub fn remove_projectile(
        sender: NetworkIdentity,
        projectile: NetworkIdentity,
        hit_target: Option<NetworkIdentity>,
    ) -> Self {
        Self::new(
            sender,
            MessageBody::RemoveProjectile {
                projectile,
                hit_target: hit_target.unwrap_or(NULL_IDENTITY),
            },
        )
    }

    pub fn kind(&self) -> MessageKind {
        self.body.kind()
    }

    /// Total frame size including the header.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.kind().payload_len()
    }

    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut out);
        out.freeze()
    }

    /// Appends the encoded frame to `out`.
    pub fn encode_into(&self, out: &mut BytesMut) {
        let kind = self.kind();
        out.reserve(self.encoded_len());
        out.put_u32(kind.payload_len() as u32);
        out.put_u8(kind.as_byte());
        out.put_u128(self.sender.as_u128());

        match &self.body {
            MessageBody::Connect | MessageBody::Disconnect => {}
            MessageBody::UpdateLocalPlayer { pose } => pose.write(out),
            MessageBody::Update { target, pose } => {
                out.put_u128(target.as_u128());
                pose.write(out);
            }
            MessageBody::RemoveProjectile {
                projectile,
                hit_target,
            } => {
                out.put_u128(projectile.as_u128());
                out.put_u128(hit_target.as_u128());
            }
        }
    }

    /// Decodes exactly one frame. Short, oversized or inconsistent frames are rejected.
    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        if frame.len() < HEADER_LEN {
            return Err(DecodeError::Truncated {
                needed: HEADER_LEN,
                available: frame.len(),
            });
        }

        let mut buf = frame;
        let declared = buf.get_u32() as usize;
        let kind = MessageKind::try_from(buf.get_u8())?;
        let sender = read_identity(&mut buf);

        let expected = kind.payload_len();
        if declared != expected {
            return Err(DecodeError::LengthMismatch {
                kind,
                declared,
                expected,
            });
        }
        if buf.remaining() < expected {
            return Err(DecodeError::Truncated {
                needed: HEADER_LEN + expected,
                available: frame.len(),
            });
        }
        if buf.remaining() > expected {
            return Err(DecodeError::TrailingBytes {
                extra: buf.remaining() - expected,
            });
        }

        let body = match kind {
            MessageKind::Connect => MessageBody::Connect,
            MessageKind::Disconnect => MessageBody::Disconnect,
            MessageKind::UpdateLocalPlayer => MessageBody::UpdateLocalPlayer {
                pose: Pose2::read(&mut buf),
            },
            MessageKind::Update => MessageBody::Update {
                target: read_identity(&mut buf),
                pose: Pose2::read(&mut buf),
            },
            MessageKind::RemoveProjectile => MessageBody::RemoveProjectile {
                projectile: read_identity(&mut buf),
                hit_target: read_identity(&mut buf),
            },
        };

        Ok(Self { sender, body })
    }
}

fn read_identity(buf: &mut &[u8]) -> NetworkIdentity {
    NetworkIdentity::from_u128(buf.get_u128())
}
