/*! Decode captured frames into mutable packet block chains.

A raw frame is parsed layer by layer (Ethernet, IPv4 with options, TCP with
options, UDP, with anything unrecognized carried as opaque data) and rebuilt
as a chain of tagged blocks that can be changed independently and serialized
back to wire order.

```rust
use pbdecode_rs::build::Context;
use pbdecode_rs::decode::Decoder;

# fn main() -> Result<(), pbdecode_rs::decode::Error> {
let frame = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02, 0x00, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06,
    0x00, 0x01,
];
let decoder = Decoder::default();
let mut ctx = Context::default();
decoder.decode_ethernet(&frame, &mut ctx)?;
assert_eq!(ctx.emit(), frame.to_vec());
# Ok(())
# }
```
*/

#[macro_use]
mod macros;

pub mod build;
pub mod config;
pub mod decode;
pub mod wire;
