/// Token for the single tick driver a scheduler accepts ticks from.
///
/// Installing a new driver invalidates every token handed out before it, so a
/// timer left over from a previous pattern or session can never advance state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickDriver {
    generation: u64,
}

impl TickDriver {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Holds at most one installed [`TickDriver`].
#[derive(Debug, Default)]
pub struct DriverSlot {
    current: Option<TickDriver>,
    generation: u64,
}

impl DriverSlot {
    /// Cancel any installed driver, then install a fresh one.
    pub fn install(&mut self) -> TickDriver {
        self.cancel();
        self.generation += 1;
        let driver = TickDriver {
            generation: self.generation,
        };
        self.current = Some(driver);
        driver
    }

    pub fn cancel(&mut self) -> Option<TickDriver> {
        self.current.take()
    }

    pub fn current(&self) -> Option<TickDriver> {
        self.current
    }

    pub fn accepts(&self, driver: TickDriver) -> bool {
        self.current == Some(driver)
    }

    pub fn installed(&self) -> usize {
        usize::from(self.current.is_some())
    }
}
