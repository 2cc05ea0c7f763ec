use crate::DBColumnFamily;
use crate::KV;

pub fn test_base_trait(eng: &dyn KV) {
    let none = eng
        .get(DBColumnFamily::Record, &"init".as_bytes().to_vec())
        .unwrap();
    assert_eq!(none, None);
    let none = eng
        .get(DBColumnFamily::Status, &"init".as_bytes().to_vec())
        .unwrap();
    assert_eq!(none, None);

    // deleting an absent key is not an error
    let r = eng.delete(DBColumnFamily::Record, &"init".as_bytes().to_vec());
    assert!(r.is_ok());

    let kvs = vec![
        ("k0".as_bytes().to_vec(), "v0".as_bytes().to_vec()),
        ("k1".as_bytes().to_vec(), "v1".as_bytes().to_vec()),
        ("k2".as_bytes().to_vec(), "v2".as_bytes().to_vec()),
    ];

    for (k, v) in kvs.iter() {
        eng.set(DBColumnFamily::Status, k, v).unwrap();
    }

    // column families do not leak into each other
    let r = eng.get(DBColumnFamily::Record, &kvs[0].0).unwrap();
    assert_eq!(None, r);
    let r = eng.get(DBColumnFamily::Status, &kvs[0].0).unwrap();
    assert_eq!(r, Some(kvs[0].1.clone()));

    eng.delete(DBColumnFamily::Status, &kvs[0].0).unwrap();
    let r = eng.get(DBColumnFamily::Status, &kvs[0].0).unwrap();
    assert!(r.is_none());

    // the other entries are untouched
    let r = eng.get(DBColumnFamily::Status, &kvs[1].0).unwrap();
    assert_eq!(r, Some(kvs[1].1.clone()));
}

pub fn test_kv_trait(eng: &dyn KV) {
    let k = "x".as_bytes().to_vec();
    let v = "3".as_bytes().to_vec();

    assert_eq!(None, eng.get_kv(&k).unwrap());

    eng.set_kv(&k, &v).unwrap();
    assert_eq!(Some(v.clone()), eng.get_kv(&k).unwrap());

    eng.delete_kv(&k).unwrap();
    assert_eq!(None, eng.get_kv(&k).unwrap());
}
