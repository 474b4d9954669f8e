//! This module is for testing only

use std::rc::Rc;
use std::cell::RefCell;

/// Shared drop counter, one per test.
pub type DropFlag = Rc<RefCell<u32>>;

/// Value that bumps its flag every time it is dropped.
#[derive(Debug)]
pub struct Tracked {
    pub value: i32,
    pub dropflag: DropFlag,
}

impl Tracked {
    pub fn new(value: i32, dropflag: &DropFlag) -> Tracked {
        Tracked { value, dropflag: dropflag.clone() }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        *self.dropflag.borrow_mut() += 1;
    }
}

#[test]
fn counts_each_drop() {
    let flag = DropFlag::default();
    let first = Tracked::new(1, &flag);
    let second = Tracked::new(2, &flag);
    assert_eq!(0, *flag.borrow());
    std::mem::drop(first);
    assert_eq!(1, *flag.borrow());
    std::mem::drop(second);
    assert_eq!(2, *flag.borrow());
}
