use crate::common::FrameId;

/// Age-counter replacement policy
///
/// Every resident frame carries an age. Touching a frame resets its age to 0
/// and ages every other resident frame by one, so the frame with the largest
/// age is the one that has gone longest without an access. Ties go to the
/// lowest frame id.
#[derive(Debug)]
pub struct AgeReplacer {
    /// Age per frame; None for frames that hold no block
    ages: Vec<Option<u64>>,
}

impl AgeReplacer {
    /// Creates a replacer tracking `num_frames` frames, all initially untracked.
    pub fn new(num_frames: usize) -> Self {
        Self {
            ages: vec![None; num_frames],
        }
    }

    /// Records an access to `frame_id`, starting to track it if needed.
    pub fn record_access(&mut self, frame_id: FrameId) {
        for (i, age) in self.ages.iter_mut().enumerate() {
            if i == frame_id.as_usize() {
                *age = Some(0);
            } else if let Some(age) = age {
                *age = age.saturating_add(1);
            }
        }
    }

    /// Picks the victim and stops tracking it.
    pub fn evict(&mut self) -> Option<FrameId> {
        let mut victim: Option<(usize, u64)> = None;
        for (i, age) in self.ages.iter().enumerate() {
            if let Some(age) = *age {
                if victim.map_or(true, |(_, oldest)| age > oldest) {
                    victim = Some((i, age));
                }
            }
        }
        let (index, _) = victim?;
        self.ages[index] = None;
        Some(FrameId::new(index as u32))
    }

    /// Stops tracking a frame whose block was released.
    pub fn remove(&mut self, frame_id: FrameId) {
        if let Some(age) = self.ages.get_mut(frame_id.as_usize()) {
            *age = None;
        }
    }

    /// Returns the age of a tracked frame.
    pub fn age(&self, frame_id: FrameId) -> Option<u64> {
        self.ages.get(frame_id.as_usize()).copied().flatten()
    }

    /// Number of tracked frames.
    pub fn size(&self) -> usize {
        self.ages.iter().filter(|age| age.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(i: u32) -> FrameId {
        FrameId::new(i)
    }

    #[test]
    fn test_ages_and_eviction_order() {
        let mut replacer = AgeReplacer::new(4);
        replacer.record_access(frame(0));
        replacer.record_access(frame(1));
        replacer.record_access(frame(2));
        assert_eq!(replacer.age(frame(0)), Some(2));
        assert_eq!(replacer.age(frame(2)), Some(0));
        assert_eq!(replacer.age(frame(3)), None);
        assert_eq!(replacer.size(), 3);

        // touching frame 0 makes frame 1 the oldest
        replacer.record_access(frame(0));
        assert_eq!(replacer.evict(), Some(frame(1)));
        assert_eq!(replacer.evict(), Some(frame(2)));
        assert_eq!(replacer.evict(), Some(frame(0)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_remove() {
        let mut replacer = AgeReplacer::new(3);
        replacer.record_access(frame(0));
        replacer.record_access(frame(1));
        replacer.remove(frame(0));
        assert_eq!(replacer.size(), 1);
        assert_eq!(replacer.evict(), Some(frame(1)));
    }

    #[test]
    fn test_removed_frame_is_not_aged() {
        let mut replacer = AgeReplacer::new(3);
        replacer.record_access(frame(2));
        replacer.record_access(frame(1));
        replacer.remove(frame(1));
        replacer.record_access(frame(0));
        assert_eq!(replacer.age(frame(1)), None);
        assert_eq!(replacer.age(frame(2)), Some(2));
        assert_eq!(replacer.evict(), Some(frame(2)));
    }
}
