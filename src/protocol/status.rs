use std::io::{self, Cursor};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{DynamicImage, GenericImageView, ImageFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ProtocolError, Result};
use crate::protocol::packet::{Packet, PacketBuffer};

const FAVICON_PREFIX: &str = "data:image/png;base64,";
const FAVICON_SIZE: u32 = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub name: String,
    pub protocol: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSample {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerInfo {
    pub max: i32,
    pub online: i32,
    pub sample: Vec<PlayerSample>,
}

/// The message of the day: either a plain string or a structured rich-text
/// object, carried verbatim. Rich-text interpretation belongs to the chat
/// layer, not here.
#[derive(Debug, Clone, PartialEq)]
pub enum Description {
    Plain(String),
    Rich(Value),
}

/// Server icon shipped inside the status response. The protocol only
/// accepts 64x64 images; the bound is checked when transcoding, not at
/// construction, so both directions report violations.
#[derive(Debug, Clone)]
pub struct Favicon(DynamicImage);

impl Favicon {
    pub fn new(image: DynamicImage) -> Self {
        Favicon(image)
    }

    pub fn image(&self) -> &DynamicImage {
        &self.0
    }

    /// Decodes a `data:image/png;base64,` URI (the prefix is optional on
    /// input) into the icon image.
    pub fn from_data_uri(uri: &str) -> Result<Favicon> {
        let encoded = uri.strip_prefix(FAVICON_PREFIX).unwrap_or(uri);
        let bytes = BASE64
            .decode(encoded)
            .map_err(|err| ProtocolError::InvalidIcon(format!("bad base64: {}", err)))?;
        let image = image::load_from_memory(&bytes)?;
        check_dimensions(&image)?;
        Ok(Favicon(image))
    }

    /// Encodes the icon as a PNG data URI.
    pub fn to_data_uri(&self) -> Result<String> {
        check_dimensions(&self.0)?;
        let mut png = Cursor::new(Vec::new());
        self.0.write_to(&mut png, ImageFormat::Png)?;
        Ok(format!("{}{}", FAVICON_PREFIX, BASE64.encode(png.into_inner())))
    }
}

fn check_dimensions(image: &DynamicImage) -> Result<()> {
    let (width, height) = image.dimensions();
    if width != FAVICON_SIZE || height != FAVICON_SIZE {
        return Err(ProtocolError::InvalidIcon(format!(
            "icon must be {}x{}, got {}x{}",
            FAVICON_SIZE, FAVICON_SIZE, width, height
        )));
    }
    Ok(())
}

/// Everything a server advertises in a status query response.
#[derive(Debug, Clone)]
pub struct ServerStatus {
    pub version: VersionInfo,
    pub players: PlayerInfo,
    pub description: Description,
    pub favicon: Option<Favicon>,
}

impl ServerStatus {
    pub fn to_json(&self) -> Result<String> {
        let mut players = Map::new();
        players.insert("max".to_owned(), self.players.max.into());
        players.insert("online".to_owned(), self.players.online.into());
        if !self.players.sample.is_empty() {
            players.insert(
                "sample".to_owned(),
                serde_json::to_value(&self.players.sample)?,
            );
        }

        let mut root = Map::new();
        root.insert("version".to_owned(), serde_json::to_value(&self.version)?);
        root.insert("players".to_owned(), Value::Object(players));
        root.insert(
            "description".to_owned(),
            match &self.description {
                Description::Plain(text) => Value::String(text.clone()),
                Description::Rich(value) => value.clone(),
            },
        );
        if let Some(favicon) = &self.favicon {
            root.insert("favicon".to_owned(), Value::String(favicon.to_data_uri()?));
        }

        Ok(Value::Object(root).to_string())
    }

    pub fn from_json(raw: &str) -> Result<ServerStatus> {
        let root: Value = serde_json::from_str(raw)?;

        let version: VersionInfo = serde_json::from_value(require(&root, "version")?.clone())?;

        let players_value = require(&root, "players")?;
        let players = PlayerInfo {
            max: require_i32(players_value, "max")?,
            online: require_i32(players_value, "online")?,
            sample: match players_value.get("sample") {
                Some(value) => serde_json::from_value(value.clone())?,
                None => Vec::new(),
            },
        };

        let description = match require(&root, "description")? {
            Value::String(text) => Description::Plain(text.clone()),
            value @ Value::Object(_) => Description::Rich(value.clone()),
            other => {
                return Err(ProtocolError::MalformedStatus(format!(
                    "description must be a string or object, got {}",
                    other
                )))
            }
        };

        let favicon = match root.get("favicon") {
            Some(Value::String(uri)) => Some(Favicon::from_data_uri(uri)?),
            Some(other) => {
                return Err(ProtocolError::MalformedStatus(format!(
                    "favicon must be a string, got {}",
                    other
                )))
            }
            None => None,
        };

        Ok(ServerStatus {
            version,
            players,
            description,
            favicon,
        })
    }
}

fn require<'a>(value: &'a Value, key: &str) -> Result<&'a Value> {
    value
        .get(key)
        .ok_or_else(|| ProtocolError::MalformedStatus(format!("missing field `{}`", key)))
}

fn require_i32(value: &Value, key: &str) -> Result<i32> {
    require(value, key)?
        .as_i64()
        .map(|number| number as i32)
        .ok_or_else(|| ProtocolError::MalformedStatus(format!("field `{}` must be an integer", key)))
}

pub struct StatusResponsePacket {
    pub status: ServerStatus,
}

impl Packet for StatusResponsePacket {
    fn packet_id() -> i32 {
        0x00
    }

    fn read_from_buffer(buffer: &mut PacketBuffer) -> Result<Self> {
        let packet_id = buffer.read_varint()?;
        if packet_id != Self::packet_id() {
            return Err(ProtocolError::IoError(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid packet ID: {}", packet_id),
            )));
        }
        Ok(StatusResponsePacket {
            status: ServerStatus::from_json(&buffer.read_string()?)?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut PacketBuffer) -> Result<()> {
        buffer.write_varint(Self::packet_id());
        buffer.write_string(&self.status.to_json()?);
        Ok(())
    }
}
