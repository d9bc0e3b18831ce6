use quartz_nbt::NbtCompound;

use crate::error::Result;
use crate::protocol::nbt;
use crate::protocol::packet::PacketBuffer;

/// One inventory slot as it crosses the wire. An occupied slot carries the
/// item id, stack size, damage/aux value and an optional NBT document; an
/// empty slot is `None` at the API level and a negative id on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemStack {
    pub id: i16,
    pub amount: i8,
    pub data: i16,
    pub nbt: Option<NbtCompound>,
}

pub fn read_item(buffer: &mut PacketBuffer) -> Result<Option<ItemStack>> {
    let id = buffer.read_i16()?;
    if id < 0 {
        return Ok(None);
    }
    Ok(Some(ItemStack {
        id,
        amount: buffer.read_i8()?,
        data: buffer.read_i16()?,
        nbt: nbt::read_nbt(buffer)?,
    }))
}

pub fn write_item(buffer: &mut PacketBuffer, item: Option<&ItemStack>) -> Result<()> {
    match item {
        None => {
            buffer.write_i16(-1);
            Ok(())
        }
        Some(item) => {
            buffer.write_i16(item.id);
            buffer.write_i8(item.amount);
            buffer.write_i16(item.data);
            nbt::write_nbt(buffer, item.nbt.as_ref())
        }
    }
}
