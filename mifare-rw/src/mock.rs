//! Mock reader driver shared by the unit tests

use bytes::Bytes;
use mifare_reader::{CardIo, Result, StateHandler, SubscriptionHandle};

mockall::mock! {
    pub Driver {}
    
    impl CardIo for Driver {
        fn connect_card(&self) -> Result<bool>;
        fn card_uid(&self) -> Result<String>;
        fn read_card_block(&self, block: u8, key_type: u8, key_index: u8) -> Result<Bytes>;
        fn write_card_block(&self, data: &[u8], block: u8, key_type: u8, key_index: u8) -> Result<()>;
        fn status_text(&self) -> String;
        fn sub_status_text(&self) -> String;
        fn subscribe(&self, handler: StateHandler) -> Result<SubscriptionHandle>;
    }
}
