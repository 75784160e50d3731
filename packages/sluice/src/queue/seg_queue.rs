// segment queue: an unrolled linked list of fixed-capacity ring buffers.

use super::container::FifoContainer;
use std::{
    fmt::{self, Debug, Formatter},
    marker::PhantomData,
    mem::{size_of, MaybeUninit},
    ptr::NonNull,
};


// "target" byte capacity of a segment's element storage.
const IDEAL_SEG_BYTES: usize = 1024;

// compute segment capacity in elems, given the byte size of an elem. always at least 1.
const fn elem_size_to_cap(elem_size: usize) -> usize {
    if elem_size == 0 {
        // edge case: ZST. storage costs nothing, so any capacity will do.
        IDEAL_SEG_BYTES
    } else if elem_size >= IDEAL_SEG_BYTES {
        // edge case: elem at least as large as a whole segment
        1
    } else {
        IDEAL_SEG_BYTES / elem_size
    }
}

// compute segment capacity in elems.
const fn seg_cap<T>() -> usize {
    elem_size_to_cap(size_of::<T>())
}

// heap allocated segment.
//
// elems are stored in a ring: if len > 0, front is slots[start] and back is
// slots[(start + len - 1) % cap]. slots are initialized iff they fall in that range.
struct Segment<T> {
    slots: Box<[MaybeUninit<T>]>,
    // invariant: start < cap
    start: usize,
    len: usize,
    // next segment towards back. owned by the SegQueue, not by this segment.
    to_back: Option<NonNull<Segment<T>>>,
}

impl<T> Segment<T> {
    // allocate empty.
    fn new() -> Box<Self> {
        Box::new(Segment {
            slots: Box::new_uninit_slice(seg_cap::<T>()),
            start: 0,
            len: 0,
            to_back: None,
        })
    }

    fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    // push elem to back. must not be full.
    fn push(&mut self, elem: T) {
        debug_assert!(!self.is_full());
        let idx = (self.start + self.len) % self.slots.len();
        self.slots[idx].write(elem);
        self.len += 1;
    }

    // pop elem from front. must not be empty.
    fn pop(&mut self) -> T {
        debug_assert!(self.len > 0);
        // safety: slots[start] is in the initialized range, and we move start past it so it will
        //         never be read again.
        let elem = unsafe { self.slots[self.start].assume_init_read() };
        self.start = (self.start + 1) % self.slots.len();
        self.len -= 1;
        elem
    }
}

impl<T> Drop for Segment<T> {
    fn drop(&mut self) {
        for j in 0..self.len {
            let idx = (self.start + j) % self.slots.len();
            // safety: idx is in the initialized range, and the slots are deallocated right after.
            unsafe { self.slots[idx].assume_init_drop() };
        }
    }
}


/// Unbounded FIFO stored as a linked list of fixed-size ring segments
///
/// Avoids both the reallocate-and-copy growth of [`VecDeque`](std::collections::VecDeque) and the
/// per-element allocation of [`LinkedList`](std::collections::LinkedList). An emptied segment is
/// kept as a spare, so a length oscillating around a segment boundary doesn't reallocate.
pub struct SegQueue<T> {
    // total length.
    len: usize,
    // front and back segments, unless no segments are linked.
    // invariant: no linked segment is empty.
    front_back: Option<(NonNull<Segment<T>>, NonNull<Segment<T>>)>,
    // pool of empty segments to pull from before allocating a new one, with a maximum size of 1.
    spare: Option<Box<Segment<T>>>,
    _owns: PhantomData<Box<Segment<T>>>,
}

impl<T> SegQueue<T> {
    /// Construct empty
    pub fn new() -> Self {
        SegQueue { len: 0, front_back: None, spare: None, _owns: PhantomData }
    }

    /// Elements in queue
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether queue is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Push to back
    pub fn push(&mut self, elem: T) {
        self.len += 1;

        if let Some((_, mut back)) = self.front_back {
            // safety: linked segments are owned by self, which we borrow mutably.
            let back = unsafe { back.as_mut() };
            if !back.is_full() {
                back.push(elem);
                return;
            }
        }

        // back is full or there is no back, so link a new segment
        let mut seg = self.spare.take().unwrap_or_else(Segment::new);
        debug_assert_eq!(seg.len, 0);
        debug_assert!(seg.to_back.is_none());
        seg.push(elem);
        let seg = NonNull::from(Box::leak(seg));
        let front = match self.front_back {
            Some((front, mut back)) => {
                // safety: same as above
                unsafe { back.as_mut().to_back = Some(seg) };
                front
            }
            // edge case: segment becomes only segment
            None => seg,
        };
        self.front_back = Some((front, seg));
    }

    /// Pop from front
    pub fn pop(&mut self) -> Option<T> {
        let (mut front, back) = self.front_back?;
        self.len -= 1;

        // safety: linked segments are owned by self, which we borrow mutably. front is non-empty
        //         per the invariant.
        let elem = unsafe { front.as_mut().pop() };

        // safety: same as above
        if unsafe { front.as_ref().len } == 0 {
            // un-link. safety: front was leaked from a box when linked, and is now unlinked.
            let mut seg = unsafe { Box::from_raw(front.as_ptr()) };
            self.front_back = seg.to_back.take().map(|new_front| (new_front, back));

            // stash or drop
            if self.spare.is_none() {
                seg.start = 0;
                self.spare = Some(seg);
            }
        }

        Some(elem)
    }

    // number of segments allocated, linked or spare.
    #[cfg(test)]
    fn segments(&self) -> usize {
        let mut n = self.spare.iter().count();
        let mut next = self.front_back.map(|(front, _)| front);
        while let Some(curr) = next {
            n += 1;
            next = unsafe { curr.as_ref().to_back };
        }
        n
    }
}

impl<T> Default for SegQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for SegQueue<T> {
    fn drop(&mut self) {
        let mut next = self.front_back.take().map(|(front, _)| front);
        while let Some(curr) = next {
            // safety: every linked segment was leaked from a box and is reachable exactly once.
            let seg = unsafe { Box::from_raw(curr.as_ptr()) };
            next = seg.to_back;
        }
    }
}

impl<T> Debug for SegQueue<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("SegQueue").field("len", &self.len).finish_non_exhaustive()
    }
}

impl<T> FifoContainer<T> for SegQueue<T> {
    fn push_back(&mut self, elem: T) {
        self.push(elem);
    }

    fn pop_front(&mut self) -> Option<T> {
        self.pop()
    }

    fn len(&self) -> usize {
        self.len
    }
}

unsafe impl<T: Send> Send for SegQueue<T> {}
unsafe impl<T: Sync> Sync for SegQueue<T> {}
