//! Slotted page implementation.
//!
//! A [`Page`] manages variable-length records inside a fixed-size data area.
//! Records are appended at the front of the data area, packed contiguously
//! up to `free_space_offset`; the slot directory describing them is packed
//! at the tail of the page. Deleting a record compacts the data area in
//! place, so the record region never contains holes.

use std::fmt;

use super::error::PageError;
use super::header::{PageHeader, PAGE_HEADER_SIZE};
use super::slot::{Slot, SlotId, SLOT_SIZE};
use super::{PageId, PAGE_SIZE};

/// Size of the data area: everything in the page after the header.
pub const DATA_AREA_SIZE: usize = PAGE_SIZE - PAGE_HEADER_SIZE;

/// Largest record that fits in an otherwise empty page (one slot entry of
/// overhead).
pub const MAX_RECORD_SIZE: usize = DATA_AREA_SIZE - SLOT_SIZE;

/// In-memory slotted page.
///
/// The page owns its data area, so a buffer pool frame allocates it once and
/// reuses it across loads; only the slot directory grows on the heap.
///
/// # Slot id stability
///
/// [`insert`](Self::insert) returns slot ids that stay valid across further
/// inserts. [`delete`](Self::delete) removes the slot entry from the packed
/// directory, shifting every later slot id down by one. Callers that need
/// stable ids must not delete.
///
/// # Example
///
/// ```
/// use strata::page::Page;
///
/// let mut page = Page::new();
/// let slot = page.insert(b"hello world").unwrap();
/// assert_eq!(page.read(slot), Some(b"hello world".as_slice()));
/// ```
pub struct Page {
    header: PageHeader,
    data: Box<[u8; DATA_AREA_SIZE]>,
    slots: Vec<Slot>,
}

impl Page {
    /// Creates an empty, unassigned page.
    pub fn new() -> Self {
        Self {
            header: PageHeader::new(),
            data: Box::new([0u8; DATA_AREA_SIZE]),
            slots: Vec::new(),
        }
    }

    /// Returns the page id, [`PageId::INVALID`] when unassigned.
    pub fn page_id(&self) -> PageId {
        self.header.page_id
    }

    /// Sets the page id.
    pub fn set_page_id(&mut self, page_id: PageId) {
        self.header.page_id = page_id;
    }

    /// Returns true if the page has been modified since construction,
    /// [`clear`](Self::clear), or the image it was deserialized from.
    pub fn is_dirty(&self) -> bool {
        self.header.dirty
    }

    /// Marks the page as modified.
    pub fn mark_dirty(&mut self) {
        self.header.dirty = true;
    }

    /// Returns the Log Sequence Number of the last modification.
    pub fn lsn(&self) -> i64 {
        self.header.lsn
    }

    /// Sets the Log Sequence Number.
    pub fn set_lsn(&mut self, lsn: i64) {
        self.header.lsn = lsn;
    }

    /// Returns the number of entries in the slot directory.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns the offset within the data area where record data ends.
    pub fn free_space_offset(&self) -> usize {
        self.header.free_space_offset as usize
    }

    /// Returns the contiguous free space between the record region and the
    /// slot directory.
    pub fn free_space(&self) -> usize {
        DATA_AREA_SIZE - self.slots.len() * SLOT_SIZE - self.free_space_offset()
    }

    /// Checks whether a record of `record_size` bytes fits, accounting for
    /// the new slot entry.
    pub fn can_insert(&self, record_size: usize) -> bool {
        self.free_space() >= record_size + SLOT_SIZE
    }

    /// Inserts a record and returns its slot id.
    ///
    /// The record is appended at `free_space_offset` and a new slot entry is
    /// added at the end of the directory, so the returned id is
    /// `slot_count − 1`.
    ///
    /// # Panics
    ///
    /// Panics if `record` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::PageFull`] if there is not enough space for the
    /// record and its slot entry.
    pub fn insert(&mut self, record: &[u8]) -> Result<SlotId, PageError> {
        assert!(!record.is_empty(), "record must not be empty");

        if !self.can_insert(record.len()) {
            return Err(PageError::PageFull {
                required: record.len() + SLOT_SIZE,
                available: self.free_space(),
            });
        }

        let offset = self.free_space_offset();
        self.data[offset..offset + record.len()].copy_from_slice(record);
        self.slots.push(Slot::new(offset as i32, record.len() as i32));

        self.header.free_space_offset += record.len() as i32;
        self.header.slot_count += 1;
        self.header.dirty = true;

        Ok(self.slots.len() - 1)
    }

    /// Reads a record by slot id.
    ///
    /// Returns `None` if the slot is out of range or invalid.
    pub fn read(&self, slot_id: SlotId) -> Option<&[u8]> {
        let slot = self.slots.get(slot_id)?;
        if !slot.is_valid {
            return None;
        }

        let start = slot.offset as usize;
        let end = start + slot.length as usize;
        Some(&self.data[start..end])
    }

    /// Deletes a record by slot id and compacts the data area in place.
    ///
    /// The bytes after the record shift left to close the gap, the slot
    /// entry is removed from the directory, and every surviving slot whose
    /// record sat after the deleted one has its offset adjusted. Slot ids
    /// greater than `slot_id` shift down by one.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::SlotNotFound`] if the slot is out of range or
    /// already deleted.
    pub fn delete(&mut self, slot_id: SlotId) -> Result<(), PageError> {
        let slot = match self.slots.get(slot_id) {
            Some(slot) if slot.is_valid => *slot,
            _ => return Err(PageError::SlotNotFound(slot_id)),
        };

        let offset = slot.offset as usize;
        let length = slot.length as usize;
        let free_space_offset = self.free_space_offset();

        // Shift the bytes after the record left over the gap.
        self.data.copy_within(offset + length..free_space_offset, offset);

        self.slots.remove(slot_id);
        for s in &mut self.slots {
            if s.offset > slot.offset {
                s.offset -= slot.length;
            }
        }

        self.header.free_space_offset -= slot.length;
        self.header.slot_count -= 1;
        self.header.dirty = true;

        Ok(())
    }

    /// Returns an iterator over all valid records with their slot ids.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &[u8])> {
        (0..self.slots.len()).filter_map(move |slot_id| self.read(slot_id).map(|r| (slot_id, r)))
    }

    /// Returns the number of valid records in the page.
    pub fn record_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_valid).count()
    }

    /// Resets the page to the empty, unassigned state.
    pub fn clear(&mut self) {
        self.header = PageHeader::new();
        self.data.fill(0);
        self.slots.clear();
    }

    /// Serializes the page into a [`PAGE_SIZE`] byte buffer.
    ///
    /// Writes the header, then the used prefix of the data area
    /// (`free_space_offset` bytes), then the slot directory packed at the
    /// tail so that slot `i` occupies the bytes at
    /// `PAGE_HEADER_SIZE + DATA_AREA_SIZE − (i + 1) · SLOT_SIZE`. The bytes
    /// between the record region and the directory are left untouched and
    /// carry no meaning.
    ///
    /// # Panics
    ///
    /// Panics if `buf.len() != PAGE_SIZE`.
    pub fn serialize(&self, buf: &mut [u8]) {
        assert_eq!(buf.len(), PAGE_SIZE, "serialize requires a full page buffer");

        self.header.write_to(&mut buf[..PAGE_HEADER_SIZE]);

        let used = self.free_space_offset();
        buf[PAGE_HEADER_SIZE..PAGE_HEADER_SIZE + used].copy_from_slice(&self.data[..used]);

        for (i, slot) in self.slots.iter().enumerate() {
            let start = PAGE_HEADER_SIZE + DATA_AREA_SIZE - (i + 1) * SLOT_SIZE;
            slot.write_to(&mut buf[start..start + SLOT_SIZE]);
        }
    }

    /// Deserializes a [`PAGE_SIZE`] byte buffer into this page.
    ///
    /// Restores the header, the used prefix of the data area, and the slot
    /// directory. The untouched middle of the data area keeps whatever bytes
    /// it held before; it is never read back through the public operations.
    ///
    /// # Panics
    ///
    /// Panics if `buf.len() != PAGE_SIZE`.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Corrupted`] if the header or a slot entry
    /// describes a layout that does not fit the page. The page contents are
    /// unspecified after a failed deserialization.
    pub fn deserialize(&mut self, buf: &[u8]) -> Result<(), PageError> {
        assert_eq!(buf.len(), PAGE_SIZE, "deserialize requires a full page buffer");

        let header = PageHeader::read_from(&buf[..PAGE_HEADER_SIZE]);
        if header.slot_count < 0 || header.free_space_offset < 0 {
            return Err(PageError::Corrupted(format!(
                "negative header field: slot_count={}, free_space_offset={}",
                header.slot_count, header.free_space_offset
            )));
        }

        let slot_count = header.slot_count as usize;
        let used = header.free_space_offset as usize;
        if slot_count * SLOT_SIZE + used > DATA_AREA_SIZE {
            return Err(PageError::Corrupted(format!(
                "{} slots and {} record bytes exceed the data area",
                slot_count, used
            )));
        }

        self.header = header;
        self.data[..used].copy_from_slice(&buf[PAGE_HEADER_SIZE..PAGE_HEADER_SIZE + used]);

        self.slots.clear();
        self.slots.reserve(slot_count);
        for i in 0..slot_count {
            let start = PAGE_HEADER_SIZE + DATA_AREA_SIZE - (i + 1) * SLOT_SIZE;
            let slot = Slot::read_from(&buf[start..start + SLOT_SIZE]);
            if slot.is_valid
                && (slot.offset < 0
                    || slot.length < 0
                    || slot.offset as usize + slot.length as usize > used)
            {
                return Err(PageError::Corrupted(format!(
                    "slot {} points outside the record region: offset={}, length={}",
                    i, slot.offset, slot.length
                )));
            }
            self.slots.push(slot);
        }

        Ok(())
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

/// Two pages are equal when their observable state matches: header, the
/// used prefix of the data area, and the slot directory. The undefined
/// middle region does not participate.
impl PartialEq for Page {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header
            && self.slots == other.slots
            && self.data[..self.free_space_offset()] == other.data[..other.free_space_offset()]
    }
}

impl Eq for Page {}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("page_id", &self.header.page_id)
            .field("dirty", &self.header.dirty)
            .field("lsn", &self.header.lsn)
            .field("free_space_offset", &self.header.free_space_offset)
            .field("slot_count", &self.header.slot_count)
            .field("free_space", &self.free_space())
            .finish()
    }
}
